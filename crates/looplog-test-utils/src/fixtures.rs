//! Reusable table fixtures.
//!
//! - [`mixed_table`]: one entry of every value kind, nested keys included.
//! - [`Point`] / [`PointCodec`]: a two-field struct type for struct paths.

use looplog_core::{StructCodec, Table, Value};

/// A 2-D point packed as two big-endian f64 values.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// [`StructCodec`] for [`Point`], published as `struct:Point`.
#[derive(Clone, Copy, Debug, Default)]
pub struct PointCodec;

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
        out.extend_from_slice(&value.x.to_be_bytes());
        out.extend_from_slice(&value.y.to_be_bytes());
    }

    fn unpack(&self, bytes: &[u8]) -> Option<Point> {
        let x = bytes.get(0..8)?.try_into().ok().map(f64::from_be_bytes)?;
        let y = bytes.get(8..16)?.try_into().ok().map(f64::from_be_bytes)?;
        Some(Point { x, y })
    }
}

/// A table holding one entry of every value kind, struct payloads and
/// their schema included.
pub fn mixed_table(timestamp: f64) -> Table {
    let mut table = Table::new(timestamp);
    table.put("Flags/Enabled", true);
    table.put("Counters/Loops", 1234i64);
    table.put("Sensors/Gyro", 0.5f32);
    table.put("Drivetrain/LeftPos", 42.0);
    table.put("Status", "nominal");
    table.put("Flags/Limits", vec![true, false, true]);
    table.put("Counters/Ticks", vec![1i64, -2, 3]);
    table.put("Sensors/Ranges", vec![1.5f32, 2.5]);
    table.put("Drivetrain/Wheels", vec![0.1, 0.2, 0.3, 0.4]);
    table.put("Status/Modes", &["auto", "teleop"][..]);
    table.put("Blob", vec![0xDEu8, 0xAD]);
    table.put("Custom", Value::raw("msgpack", vec![0x90u8]));
    table.put_struct("Odometry/Pose", &PointCodec, &Point { x: 1.0, y: 2.0 });
    table.put_struct_array(
        "Odometry/Trail",
        &PointCodec,
        &[Point { x: 0.0, y: 0.0 }, Point { x: 1.0, y: 1.0 }],
    );
    table
}
