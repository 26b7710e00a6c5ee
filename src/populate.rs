//! Copying final values onto a caller's object

use std::collections::HashMap;

use crate::error::PopulationError;
use crate::record::Record;
use crate::value::Value;

/// Something that accepts field values by name
///
/// Implement it for your own structs to receive extracted values; return
/// `PopulationError::Rejected` for a value the target cannot hold.
pub trait Populate {
    fn set_field(&mut self, name: &str, value: Value) -> Result<(), PopulationError>;
}

impl Populate for HashMap<String, Value> {
    fn set_field(&mut self, name: &str, value: Value) -> Result<(), PopulationError> {
        self.insert(name.to_string(), value);
        Ok(())
    }
}

impl Populate for serde_json::Map<String, serde_json::Value> {
    fn set_field(&mut self, name: &str, value: Value) -> Result<(), PopulationError> {
        self.insert(name.to_string(), value.to_json());
        Ok(())
    }
}

impl<P: Populate + ?Sized> Populate for &mut P {
    fn set_field(&mut self, name: &str, value: Value) -> Result<(), PopulationError> {
        (**self).set_field(name, value)
    }
}

impl Record {
    /// Set final values on `target`.
    ///
    /// `fields` defaults to every mapped field. Names are checked before
    /// anything is written, so an unknown name leaves `target` as it was.
    pub fn populate<P: Populate + ?Sized>(
        &self,
        target: &mut P,
        fields: Option<&[&str]>,
    ) -> Result<(), PopulationError> {
        let names: Vec<&str> = match fields {
            Some(fields) => fields.to_vec(),
            None => self.field_names().collect(),
        };

        if let Some(unknown) = names.iter().find(|name| !self.values().contains(name)) {
            return Err(PopulationError::UnknownField(unknown.to_string()));
        }

        for name in names {
            let value = self.get(name).cloned().unwrap_or_default();
            target.set_field(name, value)?;
        }
        Ok(())
    }
}
