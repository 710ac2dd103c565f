//! Synthetic positioning-record construction.
//!
//! Builds the sanitized record injected in place of a genuine GPS fix.
//! Sensor readings arriving from a vehicle link may be missing (a dirty
//! read from a simulator); the builder defaults them instead of letting
//! absence reach the wire. Two wire layouts exist: the 18-field base
//! layout and an extended layout with a trailing yaw field required by
//! newer links. [`send_negotiated`] tries the base layout first and
//! falls back to the extended one when the link rejects the field count.

use tracing::debug;

use crate::error::VehicleError;
use crate::vehicle::Vehicle;

/// The time-of-week field wraps at 2^32 - 1 milliseconds.
pub const TIME_WEEK_MS_MODULUS: u64 = 4_294_967_295;

/// Field count of the base record layout.
pub const BASE_FIELD_COUNT: usize = 18;

/// Field count of the extended record layout (base plus trailing yaw).
pub const EXTENDED_FIELD_COUNT: usize = 19;

/// Fix type reported when simulating total GPS loss.
pub const FIX_TYPE_NO_FIX: u8 = 0;

/// One synthetic positioning sample, field order matching the wire record:
/// `time_usec, gps_id, ignore_flags, time_week_ms, time_week, fix_type,
/// lat*1e7, lon*1e7, alt, hdop, vdop, vn, ve, vd, horiz/vert/speed
/// accuracy, satellites_visible`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyntheticFix {
    pub time_usec: u64,
    pub gps_id: u8,
    pub ignore_flags: u16,
    /// Milliseconds since epoch wrapped modulo [`TIME_WEEK_MS_MODULUS`].
    pub time_week_ms: u32,
    pub time_week: u16,
    pub fix_type: u8,
    /// Latitude in degrees scaled by 1e7.
    pub lat_e7: i32,
    /// Longitude in degrees scaled by 1e7.
    pub lon_e7: i32,
    /// Altitude in meters.
    pub alt_m: f32,
    pub hdop: f32,
    pub vdop: f32,
    pub vn: f32,
    pub ve: f32,
    pub vd: f32,
    pub horiz_accuracy: f32,
    pub vert_accuracy: f32,
    pub speed_accuracy: f32,
    pub satellites_visible: u8,
}

/// A fix framed for a specific wire layout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FixFrame {
    /// 18 positional fields.
    Base(SyntheticFix),
    /// Base fields plus a trailing yaw in centidegrees.
    Extended {
        fix: SyntheticFix,
        yaw_cdeg: u16,
    },
}

impl FixFrame {
    /// Number of positional fields in this frame.
    #[must_use]
    pub const fn field_count(&self) -> usize {
        match self {
            Self::Base(_) => BASE_FIELD_COUNT,
            Self::Extended { .. } => EXTENDED_FIELD_COUNT,
        }
    }

    /// The fix carried by this frame, regardless of layout.
    #[must_use]
    pub const fn fix(&self) -> &SyntheticFix {
        match self {
            Self::Base(fix) | Self::Extended { fix, .. } => fix,
        }
    }
}

/// Which layout a link accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixLayout {
    /// The 18-field base layout.
    Base,
    /// The extended layout with trailing yaw.
    Extended,
}

/// Builder for [`SyntheticFix`] records from possibly-missing readings.
///
/// Missing latitude/longitude default to 0, missing altitude to 0.0;
/// absence never propagates into the wire record.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyntheticFixBuilder {
    lat: Option<f64>,
    lon: Option<f64>,
    alt: Option<f64>,
    fix_type: u8,
    satellites: u8,
    timestamp_ms: Option<u64>,
}

impl SyntheticFixBuilder {
    /// Starts a builder for a hard "GPS lost" fix: no fix type, zero
    /// satellites. Position fields may still be attached so the record
    /// stays plausible to downstream consumers.
    #[must_use]
    pub fn gps_lost() -> Self {
        Self {
            fix_type: FIX_TYPE_NO_FIX,
            satellites: 0,
            ..Self::default()
        }
    }

    /// Sets the (possibly missing) latitude and longitude in degrees.
    #[must_use]
    pub const fn position(mut self, lat: Option<f64>, lon: Option<f64>) -> Self {
        self.lat = lat;
        self.lon = lon;
        self
    }

    /// Sets the (possibly missing) altitude in meters.
    #[must_use]
    pub const fn altitude(mut self, alt: Option<f64>) -> Self {
        self.alt = alt;
        self
    }

    /// Sets the coarse fix quality classification.
    #[must_use]
    pub const fn fix_type(mut self, fix_type: u8) -> Self {
        self.fix_type = fix_type;
        self
    }

    /// Sets the visible satellite count.
    #[must_use]
    pub const fn satellites(mut self, satellites: u8) -> Self {
        self.satellites = satellites;
        self
    }

    /// Overrides the wall-clock timestamp (milliseconds since epoch).
    /// Defaults to the current time when unset.
    #[must_use]
    pub const fn timestamp_ms(mut self, now_ms: u64) -> Self {
        self.timestamp_ms = Some(now_ms);
        self
    }

    /// Builds the sanitized record.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn build(self) -> SyntheticFix {
        let now_ms = self.timestamp_ms.unwrap_or_else(|| {
            u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0)
        });

        SyntheticFix {
            time_usec: 0,
            gps_id: 0,
            ignore_flags: 0,
            time_week_ms: (now_ms % TIME_WEEK_MS_MODULUS) as u32,
            time_week: 0,
            fix_type: self.fix_type,
            lat_e7: self.lat.map_or(0, |v| (v * 1e7) as i32),
            lon_e7: self.lon.map_or(0, |v| (v * 1e7) as i32),
            alt_m: self.alt.map_or(0.0, |v| v as f32),
            hdop: 1.0,
            vdop: 1.0,
            vn: 0.0,
            ve: 0.0,
            vd: 0.0,
            horiz_accuracy: 0.2,
            vert_accuracy: 0.2,
            speed_accuracy: 0.2,
            satellites_visible: self.satellites,
        }
    }
}

/// Sends a fix to the vehicle, negotiating the record layout.
///
/// Attempts the base layout first; when the link rejects the field count
/// the extended layout is retried with a zero yaw. Returns the layout the
/// link accepted so callers (and tests) can observe the negotiation.
///
/// # Errors
///
/// Returns any [`VehicleError`] other than the base-layout rejection.
pub async fn send_negotiated(
    vehicle: &dyn Vehicle,
    fix: SyntheticFix,
) -> Result<FixLayout, VehicleError> {
    match vehicle.send_fix(&FixFrame::Base(fix)).await {
        Ok(()) => Ok(FixLayout::Base),
        Err(VehicleError::UnsupportedFixLayout { fields }) => {
            debug!(fields, "base fix layout rejected, retrying extended");
            vehicle
                .send_fix(&FixFrame::Extended { fix, yaw_cdeg: 0 })
                .await?;
            Ok(FixLayout::Extended)
        }
        Err(e) => Err(e),
    }
}
