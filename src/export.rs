use std::io::{Read, Write};

use serde_json::{Map, Value};

use crate::encoding::ValueCodec;
use crate::error::{Error, Result};
use crate::store::Store;

impl<C: ValueCodec> Store<C> {
    /// Writes every live key as a member of one JSON object, emitting stored
    /// value bytes as raw JSON fragments. Assumes values were written through
    /// a JSON-producing codec.
    pub fn export_json<W: Write>(&self, w: &mut W) -> Result<()> {
        let keys = self.get_keys("", -1);
        self.export_keys(w, &keys)
    }

    /// Exports the live keys containing `with` as a JSON object.
    pub fn export_keys_json<W: Write>(&self, w: &mut W, with: &str) -> Result<()> {
        let keys = self.get_keys(with, -1);
        self.export_keys(w, &keys)
    }

    /// Exports a single key as a JSON object. Returns `Error::KeyNotFound`
    /// if the key is not live.
    pub fn export_key_json<W: Write>(&self, w: &mut W, key: &str) -> Result<()> {
        self.export_keys(w, &[key.to_string()])
    }

    fn export_keys<W: Write>(&self, w: &mut W, keys: &[String]) -> Result<()> {
        w.write_all(b"{\n")?;
        for (count, key) in keys.iter().enumerate() {
            if count > 0 {
                w.write_all(b",\n")?;
            }
            let value = self.get_bytes(key)?;
            write!(w, " \"{key}\" : ")?;
            w.write_all(&value)?;
        }
        w.write_all(b"\n}\n")?;
        Ok(())
    }

    /// Parses a single JSON object and puts every member through the store's
    /// codec.
    pub fn import_json<R: Read>(&mut self, r: &mut R) -> Result<()> {
        let imported: Map<String, Value> = serde_json::from_reader(r)?;
        for (key, value) in imported {
            self.put(&key, &value)?;
        }
        Ok(())
    }

    /// Imports CSV: the first row names the fields, and every later row
    /// becomes a put of `row[key_index]` mapped to an object of field name
    /// to value.
    pub fn import_csv<R: Read>(&mut self, r: &mut R, key_index: usize) -> Result<()> {
        let mut rows = parse_csv(r)?.into_iter();
        let header = match rows.next() {
            Some(header) => header,
            None => return Ok(()),
        };

        for row in rows {
            let key = row
                .get(key_index)
                .ok_or_else(|| {
                    Error::Serialize(format!("csv row has no key field at index {key_index}"))
                })?
                .clone();

            let mut object = Map::new();
            for (i, field) in row.into_iter().enumerate() {
                let name = header.get(i).cloned().unwrap_or_else(|| i.to_string());
                object.insert(name, Value::String(field));
            }
            self.put(&key, &Value::Object(object))?;
        }
        Ok(())
    }
}

/// Minimal CSV reader: comma separated, double quotes with `""` escapes,
/// LF or CRLF row endings. Blank lines are skipped.
fn parse_csv<R: Read>(r: &mut R) -> Result<Vec<Vec<String>>> {
    let mut text = String::new();
    r.read_to_string(&mut text)?;

    let mut rows = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut quoted = false;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        if quoted {
            match ch {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => quoted = false,
                _ => field.push(ch),
            }
            continue;
        }
        match ch {
            '"' if field.is_empty() => quoted = true,
            ',' => row.push(std::mem::take(&mut field)),
            '\r' => {}
            '\n' => {
                if row.is_empty() && field.is_empty() {
                    continue; // blank line
                }
                row.push(std::mem::take(&mut field));
                rows.push(std::mem::take(&mut row));
            }
            _ => field.push(ch),
        }
    }
    if !row.is_empty() || !field.is_empty() {
        row.push(field);
        rows.push(row);
    }
    Ok(rows)
}
