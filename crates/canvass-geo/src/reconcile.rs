//! Merging resolved addresses into the form's location fields without
//! clobbering operator input.

use std::collections::HashMap;

use canvass_core::{normalize_label, AddressField, ResolvedAddress};
use serde::Serialize;

/// Who last wrote a location field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldOrigin {
    #[default]
    Empty,
    Resolved,
    Operator,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Slot {
    value: String,
    origin: FieldOrigin,
}

/// The city, district and province fields plus each one's origin.
#[derive(Debug, Clone, Default)]
pub struct LocationFields {
    slots: HashMap<AddressField, Slot>,
}

impl LocationFields {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value of `field`, empty when unset.
    #[must_use]
    pub fn get(&self, field: AddressField) -> &str {
        self.slots.get(&field).map_or("", |slot| slot.value.as_str())
    }

    #[must_use]
    pub fn origin(&self, field: AddressField) -> FieldOrigin {
        self.slots.get(&field).map_or(FieldOrigin::Empty, |slot| slot.origin)
    }

    /// Records an operator edit. A blank edit hands the field back to
    /// automatic resolution.
    pub fn edit(&mut self, field: AddressField, value: &str) {
        let value = value.trim();
        if value.is_empty() {
            self.slots.remove(&field);
        } else {
            self.slots.insert(
                field,
                Slot {
                    value: value.to_owned(),
                    origin: FieldOrigin::Operator,
                },
            );
        }
    }

    /// Writes every resolved level into fields that are empty or were
    /// themselves resolved earlier. Operator-edited fields are left alone,
    /// and a city or district equal to the effective province is skipped.
    ///
    /// Returns the fields that changed.
    pub fn apply_resolved(&mut self, address: &ResolvedAddress) -> Vec<AddressField> {
        let province_key = address
            .get(AddressField::Province)
            .map(normalize_label)
            .or_else(|| Some(normalize_label(self.get(AddressField::Province))).filter(|k| !k.is_empty()));

        let mut changed = Vec::new();
        for field in AddressField::ALL {
            let Some(value) = address.get(field) else {
                continue;
            };
            if self.origin(field) == FieldOrigin::Operator {
                tracing::debug!(?field, "keeping operator-edited value");
                continue;
            }
            if field != AddressField::Province && province_key.as_deref() == Some(normalize_label(value).as_str()) {
                tracing::debug!(?field, value, "skipping value that repeats the province");
                continue;
            }
            let slot = Slot {
                value: value.to_owned(),
                origin: FieldOrigin::Resolved,
            };
            if self.slots.get(&field) != Some(&slot) {
                self.slots.insert(field, slot);
                changed.push(field);
            }
        }
        changed
    }

    /// Empties every field, used after a successful submission.
    pub fn clear(&mut self) {
        self.slots.clear();
    }

    /// Plain copy of the current values.
    #[must_use]
    pub fn to_address(&self) -> ResolvedAddress {
        let value = |field| Some(self.get(field).to_owned()).filter(|v| !v.is_empty());
        ResolvedAddress {
            city: value(AddressField::City),
            district: value(AddressField::District),
            province: value(AddressField::Province),
        }
    }
}
