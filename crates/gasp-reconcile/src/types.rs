use serde::Serialize;
use serde_json::{Map, Value};

/// Field stripped from a desired setting before the containment check.
///
/// Remote objects of a polymorphic type (creatives, targeting criteria) are
/// created with a type discriminator that never comes back as a plain field.
pub const TYPE_DISCRIMINATOR: &str = "xsi_type";

/// Desired state for one remote object: remote field name -> value.
pub type Setting = Map<String, Value>;

/// Capability the diff needs from a remote object.
pub trait RemoteEntity {
    /// Value of a single field, if present.
    fn field(&self, name: &str) -> Option<&Value>;

    /// The entity as a plain field mapping.
    fn to_fields(&self) -> Map<String, Value>;
}

impl RemoteEntity for Map<String, Value> {
    fn field(&self, name: &str) -> Option<&Value> {
        self.get(name)
    }

    fn to_fields(&self) -> Map<String, Value> {
        self.clone()
    }
}

/// Non-object values expose no fields.
impl RemoteEntity for Value {
    fn field(&self, name: &str) -> Option<&Value> {
        self.as_object().and_then(|m| m.get(name))
    }

    fn to_fields(&self) -> Map<String, Value> {
        self.as_object().cloned().unwrap_or_default()
    }
}

/// Three-way partition of the desired settings.
///
/// Every desired setting lands in exactly one list, in input order.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct DiffResult {
    /// No remote object carries this key yet.
    pub notfound: Vec<Setting>,
    /// Key matches a remote object whose fields diverge.
    pub different: Vec<Setting>,
    /// Key matches a remote object that already satisfies the setting.
    pub existing: Vec<Setting>,
}

impl DiffResult {
    pub fn len(&self) -> usize {
        self.notfound.len() + self.different.len() + self.existing.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `true` when the three lists together account for `desired_len` settings.
    pub fn is_partition_of(&self, desired_len: usize) -> bool {
        self.len() == desired_len
    }

    pub fn counts(&self) -> DiffCounts {
        DiffCounts {
            notfound: self.notfound.len(),
            different: self.different.len(),
            existing: self.existing.len(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DiffCounts {
    pub notfound: usize,
    pub different: usize,
    pub existing: usize,
}
