//! Data types shared by the encoder and decoder.

/// A key definition record: binds a 16-bit ID to a key name and the
/// declared type of every value record that references the ID.
///
/// # Examples
///
/// ```
/// use looplog_rlog::KeyDefinition;
///
/// let def = KeyDefinition {
///     id: 0,
///     name: "/Drivetrain/LeftPos".into(),
///     type_name: "double".into(),
/// };
///
/// assert_eq!(def.table_key(), "Drivetrain/LeftPos");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyDefinition {
    /// Interned key ID.
    pub id: u16,
    /// Key name as it appears on the wire, usually with a leading `/`.
    pub name: String,
    /// Declared type name, e.g. `"double"` or `"struct:Pose2d"`.
    pub type_name: String,
}

impl KeyDefinition {
    /// The key in canonical table form (separators trimmed and collapsed).
    pub fn table_key(&self) -> String {
        looplog_core::normalize_key(&self.name)
    }
}
