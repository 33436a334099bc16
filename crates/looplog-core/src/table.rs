//! Hierarchical typed table: one cycle's complete log snapshot.
//!
//! Keys are `/`-separated paths. [`normalize_key`] canonicalizes them, so
//! `"/Drivetrain/LeftPos"`, `"Drivetrain/LeftPos"` and
//! `"Drivetrain//LeftPos/"` all address the same entry. A [`SubTable`] is a
//! view rooted at a key prefix; writes through it land in the parent table
//! under the prefixed key.

use indexmap::IndexMap;

use crate::traits::StructCodec;
use crate::value::{FromValue, Value, STRUCT_PREFIX, STRUCT_SCHEMA_TYPE};

/// Root under which struct schemas are published.
pub const SCHEMA_ROOT: &str = ".schema";

/// Canonicalize a key path: drop empty segments (leading, trailing and
/// doubled `/`).
///
/// ```
/// use looplog_core::normalize_key;
///
/// assert_eq!(normalize_key("/Drivetrain//LeftPos/"), "Drivetrain/LeftPos");
/// assert_eq!(normalize_key("/"), "");
/// ```
pub fn normalize_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for segment in key.split('/').filter(|s| !s.is_empty()) {
        if !out.is_empty() {
            out.push('/');
        }
        out.push_str(segment);
    }
    out
}

fn join_key(prefix: &str, key: &str) -> String {
    let key = normalize_key(key);
    match (prefix.is_empty(), key.is_empty()) {
        (true, _) => key,
        (false, true) => prefix.to_owned(),
        (false, false) => format!("{prefix}/{key}"),
    }
}

/// An ordered mapping from key path to [`Value`], stamped with the cycle
/// timestamp in seconds.
///
/// A table is always a complete snapshot: cloning it for the next cycle
/// carries every prior entry forward. `clone()` is a deep copy, so the
/// producer can keep mutating the live table while a clone travels to
/// sinks on another thread.
///
/// # Examples
///
/// ```
/// use looplog_core::Table;
///
/// let mut table = Table::new(1.5);
/// table.put("/Drivetrain/LeftPos", 42.0);
/// table.subtable("Drivetrain").put("RightPos", 41.0);
///
/// assert_eq!(table.get("Drivetrain/LeftPos", 0.0), 42.0);
/// assert_eq!(table.get("/Drivetrain/RightPos", 0.0), 41.0);
/// assert_eq!(table.get("Drivetrain/Missing", -1.0), -1.0);
/// assert_eq!(table.timestamp(), 1.5);
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Table {
    timestamp: f64,
    entries: IndexMap<String, Value>,
}

impl Table {
    /// Create an empty table with the given timestamp.
    pub fn new(timestamp: f64) -> Self {
        Self {
            timestamp,
            entries: IndexMap::new(),
        }
    }

    /// Cycle timestamp in seconds.
    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }

    /// Overwrite the cycle timestamp.
    pub fn set_timestamp(&mut self, timestamp: f64) {
        self.timestamp = timestamp;
    }

    /// Number of entries in the whole table.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the table holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Read `key` as `T`, or `default` if absent or of another type.
    pub fn get<T: FromValue>(&self, key: &str, default: T) -> T {
        self.get_value(key)
            .and_then(T::from_value)
            .unwrap_or(default)
    }

    /// The stored value under `key`, if any.
    pub fn get_value(&self, key: &str) -> Option<&Value> {
        self.entries.get(&normalize_key(key))
    }

    /// True if an entry exists under `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.get_value(key).is_some()
    }

    /// Store `value` under `key`, replacing any previous value.
    pub fn put(&mut self, key: &str, value: impl Into<Value>) {
        self.insert(join_key("", key), value.into());
    }

    /// Remove the entry under `key`, returning it.
    ///
    /// The log format has no removal record: a decoder carries the key
    /// forward with the last value it saw, so a removed key reappears in a
    /// replayed session.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.entries.shift_remove(&normalize_key(key))
    }

    /// A view rooted at `prefix`.
    pub fn subtable(&mut self, prefix: &str) -> SubTable<'_> {
        SubTable {
            prefix: normalize_key(prefix),
            table: self,
        }
    }

    /// Entries of the whole table in insertion order.
    ///
    /// With `include_subtables == false` only top-level keys (no `/`) are
    /// returned.
    pub fn entries(&self, include_subtables: bool) -> Vec<(&str, &Value)> {
        self.entries_in("", include_subtables)
    }

    /// Store a struct value through `codec`, publishing its schema under
    /// [`SCHEMA_ROOT`].
    pub fn put_struct<T>(&mut self, key: &str, codec: &dyn StructCodec<T>, value: &T) {
        self.put_struct_in("", key, codec, std::slice::from_ref(value), false);
    }

    /// Store an array of struct values through `codec`.
    pub fn put_struct_array<T>(&mut self, key: &str, codec: &dyn StructCodec<T>, values: &[T]) {
        self.put_struct_in("", key, codec, values, true);
    }

    /// Read a struct value through `codec`, or `default` on absence or
    /// type mismatch.
    pub fn get_struct<T>(&self, key: &str, codec: &dyn StructCodec<T>, default: T) -> T {
        self.get_struct_in("", key, codec).unwrap_or(default)
    }

    /// Read an array of struct values through `codec`.
    pub fn get_struct_array<T>(&self, key: &str, codec: &dyn StructCodec<T>) -> Option<Vec<T>> {
        self.get_struct_array_in("", key, codec)
    }

    /// Store a two-dimensional array: the row count under `key/length`
    /// and row `i` under `key/i`.
    ///
    /// ```
    /// use looplog_core::Table;
    ///
    /// let mut table = Table::new(0.0);
    /// table.put_rows("Grid", &[vec![1.0, 2.0], vec![3.0]]);
    /// assert_eq!(table.get("Grid/length", 0i64), 2);
    /// assert_eq!(table.get_rows::<Vec<f64>>("Grid"), Some(vec![vec![1.0, 2.0], vec![3.0]]));
    /// ```
    pub fn put_rows<R: Clone + Into<Value>>(&mut self, key: &str, rows: &[R]) {
        self.put_rows_in("", key, rows);
    }

    /// Read rows stored by [`put_rows`](Self::put_rows). `None` if the
    /// length entry is missing or any row is absent or of another type.
    pub fn get_rows<T: FromValue>(&self, key: &str) -> Option<Vec<T>> {
        self.get_rows_in("", key)
    }

    fn insert(&mut self, key: String, value: Value) {
        // Replacing keeps the original insertion slot.
        self.entries.insert(key, value);
    }

    fn entries_in(&self, prefix: &str, include_subtables: bool) -> Vec<(&str, &Value)> {
        self.entries
            .iter()
            .filter_map(|(key, value)| {
                let relative = if prefix.is_empty() {
                    key.as_str()
                } else {
                    key.strip_prefix(prefix)?.strip_prefix('/')?
                };
                if !include_subtables && relative.contains('/') {
                    return None;
                }
                Some((relative, value))
            })
            .collect()
    }

    fn put_struct_in<T>(
        &mut self,
        prefix: &str,
        key: &str,
        codec: &dyn StructCodec<T>,
        values: &[T],
        as_array: bool,
    ) {
        let mut type_name = format!("{STRUCT_PREFIX}{}", codec.type_name());
        let schema_key = format!("{SCHEMA_ROOT}/{type_name}");
        if !self.entries.contains_key(&schema_key) {
            self.insert(
                schema_key,
                Value::raw(STRUCT_SCHEMA_TYPE, codec.schema().as_bytes().to_vec()),
            );
        }
        if as_array {
            type_name.push_str("[]");
        }
        let mut bytes = Vec::with_capacity(codec.size() * values.len());
        for value in values {
            codec.pack(value, &mut bytes);
        }
        self.insert(join_key(prefix, key), Value::raw(type_name, bytes));
    }

    fn put_rows_in<R: Clone + Into<Value>>(&mut self, prefix: &str, key: &str, rows: &[R]) {
        let base = join_key(prefix, key);
        let len = i64::try_from(rows.len()).unwrap_or(i64::MAX);
        self.insert(join_key(&base, "length"), Value::Integer(len));
        for (i, row) in rows.iter().enumerate() {
            self.insert(join_key(&base, &i.to_string()), row.clone().into());
        }
    }

    fn get_rows_in<T: FromValue>(&self, prefix: &str, key: &str) -> Option<Vec<T>> {
        let base = join_key(prefix, key);
        let len = match self.entries.get(&join_key(&base, "length"))? {
            Value::Integer(n) => usize::try_from(*n).ok()?,
            _ => return None,
        };
        (0..len)
            .map(|i| {
                self.entries
                    .get(&join_key(&base, &i.to_string()))
                    .and_then(T::from_value)
            })
            .collect()
    }

    fn struct_bytes(&self, full_key: &str, codec_type: &str, as_array: bool) -> Option<&[u8]> {
        let value = self.entries.get(full_key)?;
        if value.struct_type_name() != Some(codec_type) || value.is_struct_array() != as_array {
            return None;
        }
        match value {
            Value::Raw { bytes, .. } => Some(bytes.as_slice()),
            _ => None,
        }
    }

    fn get_struct_in<T>(&self, prefix: &str, key: &str, codec: &dyn StructCodec<T>) -> Option<T> {
        let bytes = self.struct_bytes(&join_key(prefix, key), codec.type_name(), false)?;
        codec.unpack(bytes)
    }

    fn get_struct_array_in<T>(
        &self,
        prefix: &str,
        key: &str,
        codec: &dyn StructCodec<T>,
    ) -> Option<Vec<T>> {
        let bytes = self.struct_bytes(&join_key(prefix, key), codec.type_name(), true)?;
        let size = codec.size();
        if size == 0 || bytes.len() % size != 0 {
            return None;
        }
        bytes.chunks_exact(size).map(|chunk| codec.unpack(chunk)).collect()
    }
}

/// A mutable view of a [`Table`] rooted at a key prefix.
///
/// Every read and write is translated to `prefix/key` in the parent table.
/// The timestamp is shared with the parent.
#[derive(Debug)]
pub struct SubTable<'a> {
    table: &'a mut Table,
    prefix: String,
}

impl SubTable<'_> {
    /// The normalized prefix of this view (empty for the root).
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Parent table timestamp in seconds.
    pub fn timestamp(&self) -> f64 {
        self.table.timestamp
    }

    /// Read `key` as `T`, or `default` if absent or of another type.
    pub fn get<T: FromValue>(&self, key: &str, default: T) -> T {
        self.get_value(key)
            .and_then(T::from_value)
            .unwrap_or(default)
    }

    /// The stored value under `key`, if any.
    pub fn get_value(&self, key: &str) -> Option<&Value> {
        self.table.entries.get(&join_key(&self.prefix, key))
    }

    /// True if an entry exists under `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.get_value(key).is_some()
    }

    /// Store `value` under `key` relative to this view.
    pub fn put(&mut self, key: &str, value: impl Into<Value>) {
        let full = join_key(&self.prefix, key);
        self.table.insert(full, value.into());
    }

    /// Remove the entry under `key` relative to this view. See
    /// [`Table::remove`] for how removal interacts with replay.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let full = join_key(&self.prefix, key);
        self.table.entries.shift_remove(&full)
    }

    /// A nested view rooted at `prefix` relative to this one.
    pub fn subtable(&mut self, prefix: &str) -> SubTable<'_> {
        SubTable {
            prefix: join_key(&self.prefix, prefix),
            table: &mut *self.table,
        }
    }

    /// Entries under this view, with keys relative to the prefix.
    pub fn entries(&self, include_subtables: bool) -> Vec<(&str, &Value)> {
        self.table.entries_in(&self.prefix, include_subtables)
    }

    /// Store a struct value through `codec`.
    pub fn put_struct<T>(&mut self, key: &str, codec: &dyn StructCodec<T>, value: &T) {
        self.table
            .put_struct_in(&self.prefix, key, codec, std::slice::from_ref(value), false);
    }

    /// Store an array of struct values through `codec`.
    pub fn put_struct_array<T>(&mut self, key: &str, codec: &dyn StructCodec<T>, values: &[T]) {
        self.table
            .put_struct_in(&self.prefix, key, codec, values, true);
    }

    /// Read a struct value through `codec`, or `default`.
    pub fn get_struct<T>(&self, key: &str, codec: &dyn StructCodec<T>, default: T) -> T {
        self.table
            .get_struct_in(&self.prefix, key, codec)
            .unwrap_or(default)
    }

    /// Read an array of struct values through `codec`.
    pub fn get_struct_array<T>(&self, key: &str, codec: &dyn StructCodec<T>) -> Option<Vec<T>> {
        self.table.get_struct_array_in(&self.prefix, key, codec)
    }

    /// Store a two-dimensional array relative to this view.
    pub fn put_rows<R: Clone + Into<Value>>(&mut self, key: &str, rows: &[R]) {
        self.table.put_rows_in(&self.prefix, key, rows);
    }

    /// Read rows stored by [`put_rows`](Self::put_rows).
    pub fn get_rows<T: FromValue>(&self, key: &str) -> Option<Vec<T>> {
        self.table.get_rows_in(&self.prefix, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[derive(Clone, Debug, PartialEq)]
    struct Point {
        x: f64,
        y: f64,
    }

    struct PointCodec;

    impl StructCodec<Point> for PointCodec {
        fn type_name(&self) -> &str {
            "Point"
        }

        fn schema(&self) -> &str {
            "double x;double y"
        }

        fn size(&self) -> usize {
            16
        }

        fn pack(&self, value: &Point, out: &mut Vec<u8>) {
            out.extend_from_slice(&value.x.to_le_bytes());
            out.extend_from_slice(&value.y.to_le_bytes());
        }

        fn unpack(&self, bytes: &[u8]) -> Option<Point> {
            let x = f64::from_le_bytes(bytes.get(0..8)?.try_into().ok()?);
            let y = f64::from_le_bytes(bytes.get(8..16)?.try_into().ok()?);
            Some(Point { x, y })
        }
    }

    #[test]
    fn missing_key_returns_default() {
        let table = Table::new(0.0);
        assert_eq!(table.get("nope", 3i64), 3);
        assert!(table.get_value("nope").is_none());
    }

    #[test]
    fn type_mismatch_returns_default() {
        let mut table = Table::new(0.0);
        table.put("speed", 1.5f32);
        assert_eq!(table.get("speed", 0.0f64), 0.0);
        assert_eq!(table.get("speed", 0.0f32), 1.5);
    }

    #[test]
    fn put_replaces_in_place() {
        let mut table = Table::new(0.0);
        table.put("a", 1i64);
        table.put("b", 2i64);
        table.put("a", "now a string");
        let keys: Vec<_> = table.entries(true).into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(table.get("a", String::new()), "now a string");
    }

    #[test]
    fn remove_is_silent_for_missing() {
        let mut table = Table::new(0.0);
        table.put("a", true);
        assert_eq!(table.remove("/a"), Some(Value::Boolean(true)));
        assert_eq!(table.remove("a"), None);
        assert!(table.is_empty());
    }

    #[test]
    fn subtable_writes_land_in_parent() {
        let mut table = Table::new(2.0);
        {
            let mut arm = table.subtable("/Arm/");
            arm.put("Angle", 0.25);
            arm.subtable("Motor").put("Current", 12.0);
            assert_eq!(arm.timestamp(), 2.0);
            assert_eq!(arm.get("Angle", 0.0), 0.25);
        }
        assert_eq!(table.get("Arm/Angle", 0.0), 0.25);
        assert_eq!(table.get("/Arm/Motor/Current", 0.0), 12.0);
    }

    #[test]
    fn entries_respects_subtable_flag() {
        let mut table = Table::new(0.0);
        table.put("Arm/Angle", 1.0);
        table.put("Arm/Motor/Current", 2.0);
        table.put("Armature", 3.0);

        let mut arm = table.subtable("Arm");
        let direct: Vec<_> = arm.entries(false).into_iter().map(|(k, _)| k).collect();
        assert_eq!(direct, vec!["Angle"]);
        let all: Vec<_> = arm.entries(true).into_iter().map(|(k, _)| k).collect();
        assert_eq!(all, vec!["Angle", "Motor/Current"]);
        arm.remove("Angle");

        let top: Vec<_> = table.entries(false).into_iter().map(|(k, _)| k).collect();
        assert_eq!(top, vec!["Armature"]);
    }

    #[test]
    fn clone_is_independent() {
        let mut live = Table::new(1.0);
        live.put("x", 1i64);
        let snapshot = live.clone();
        live.put("x", 2i64);
        live.put("y", 3i64);
        live.set_timestamp(2.0);

        assert_eq!(snapshot.timestamp(), 1.0);
        assert_eq!(snapshot.get("x", 0i64), 1);
        assert!(!snapshot.contains("y"));
    }

    #[test]
    fn struct_roundtrip_publishes_schema() {
        let mut table = Table::new(0.0);
        let p = Point { x: 1.0, y: -2.0 };
        table.subtable("Odometry").put_struct("Pose", &PointCodec, &p);

        let schema = table.get_value(".schema/struct:Point").unwrap();
        assert_eq!(schema.type_name(), STRUCT_SCHEMA_TYPE);
        assert_eq!(
            table.get_value("Odometry/Pose").unwrap().type_name(),
            "struct:Point"
        );
        let back = table.get_struct("Odometry/Pose", &PointCodec, Point { x: 0.0, y: 0.0 });
        assert_eq!(back, p);
    }

    #[test]
    fn struct_array_roundtrip() {
        let mut table = Table::new(0.0);
        let points = vec![Point { x: 1.0, y: 2.0 }, Point { x: 3.0, y: 4.0 }];
        table.put_struct_array("Path", &PointCodec, &points);

        assert_eq!(
            table.get_value("Path").unwrap().type_name(),
            "struct:Point[]"
        );
        assert_eq!(table.get_struct_array("Path", &PointCodec), Some(points));
        // A scalar read of an array payload is a type mismatch.
        let fallback = Point { x: 9.0, y: 9.0 };
        assert_eq!(
            table.get_struct("Path", &PointCodec, fallback.clone()),
            fallback
        );
    }

    #[test]
    fn rows_flatten_under_key() {
        let mut table = Table::new(0.0);
        let modes: [&[&str]; 2] = [&["auto", "teleop"], &["test"]];
        table.subtable("Routines").put_rows("Modes", &modes);

        assert_eq!(table.get("Routines/Modes/length", 0i64), 2);
        assert_eq!(
            table.get("Routines/Modes/1", Vec::<String>::new()),
            vec!["test".to_owned()]
        );
        assert_eq!(
            table.subtable("Routines").get_rows::<Vec<String>>("Modes"),
            Some(vec![
                vec!["auto".to_owned(), "teleop".to_owned()],
                vec!["test".to_owned()],
            ])
        );
    }

    #[test]
    fn rows_with_a_missing_or_mistyped_row_read_as_none() {
        let mut table = Table::new(0.0);
        table.put_rows("Grid", &[vec![1i64], vec![2, 3]]);
        assert_eq!(table.get_rows::<Vec<f64>>("Grid"), None);

        table.remove("Grid/1");
        assert_eq!(table.get_rows::<Vec<i64>>("Grid"), None);
        assert_eq!(table.get_rows::<Vec<i64>>("Absent"), None);
    }

    proptest! {
        #[test]
        fn normalize_is_idempotent(key in "[/a-z]{0,24}") {
            let once = normalize_key(&key);
            prop_assert_eq!(normalize_key(&once), once.clone());
            prop_assert!(!once.starts_with('/'));
            prop_assert!(!once.ends_with('/'));
            prop_assert!(!once.contains("//"));
        }
    }
}
