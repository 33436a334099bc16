//! Benchmark profiles for looplog.
//!
//! Provides pre-built table sequences shaped like a real control loop:
//!
//! - [`drivetrain_profile`]: a swerve-drive sized table (~30 keys)
//! - [`telemetry_profile`]: a wide table with a large array (~400 keys)

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use looplog_core::Table;

/// Nominal control loop period in seconds.
pub const LOOP_PERIOD: f64 = 0.02;

/// Build `cycles` snapshots of a drivetrain-sized table.
///
/// Four modules with a handful of scalars each, plus gyro, pose and a
/// status string. Values change every cycle.
pub fn drivetrain_profile(cycles: usize) -> Vec<Table> {
    let mut table = Table::new(0.0);
    (0..cycles)
        .map(|i| {
            let t = i as f64 * LOOP_PERIOD;
            table.set_timestamp(t);
            for module in 0..4 {
                let mut sub = table.subtable(&format!("Drive/Module{module}"));
                sub.put("DrivePositionRad", t * (module + 1) as f64);
                sub.put("DriveVelocityRadPerSec", (t + module as f64).sin());
                sub.put("DriveAppliedVolts", 12.0 * (t * 0.5).cos());
                sub.put("DriveCurrentAmps", vec![1.5, 1.6]);
                sub.put("TurnAbsolutePosition", (t * 3.0) % std::f64::consts::TAU);
                sub.put("TurnConnected", true);
            }
            table.put("Gyro/YawRad", t * 0.1);
            table.put("Gyro/Connected", true);
            table.put("Odometry/Pose", vec![t, t * 0.5, t * 0.1]);
            table.put("Status", if i % 50 == 0 { "sync" } else { "nominal" });
            table.put("Loops", i as i64);
            table.clone()
        })
        .collect()
}

/// Build `cycles` snapshots of a wide telemetry table.
///
/// 400 double keys and a 256-element array, modelling a vision or
/// diagnostics heavy robot.
pub fn telemetry_profile(cycles: usize) -> Vec<Table> {
    let mut table = Table::new(0.0);
    (0..cycles)
        .map(|i| {
            let t = i as f64 * LOOP_PERIOD;
            table.set_timestamp(t);
            for k in 0..400 {
                table.put(&format!("Telemetry/Channel{k}"), t + k as f64);
            }
            let samples: Vec<f64> = (0..256).map(|s| (t + s as f64).sin()).collect();
            table.put("Vision/Samples", samples);
            table.clone()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profiles_have_increasing_timestamps() {
        for tables in [drivetrain_profile(5), telemetry_profile(5)] {
            assert_eq!(tables.len(), 5);
            assert!(tables
                .windows(2)
                .all(|w| w[0].timestamp() < w[1].timestamp()));
        }
    }

    #[test]
    fn drivetrain_profile_is_nested() {
        let tables = drivetrain_profile(1);
        assert!(tables[0].contains("Drive/Module3/TurnConnected"));
        assert_eq!(tables[0].get("Loops", -1i64), 0);
    }
}
