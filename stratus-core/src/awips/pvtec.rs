//! P-VTEC (primary Valid Time Event Code) parsing
//!
//! A P-VTEC string takes the form
//! `/k.aaa.cccc.pp.s.####.yymmddThhnnZ-yymmddThhnnZ/` (NWSI 10-1703).

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDateTime, Utc};
use regex::Regex;

use crate::error::DecodeError;

static RE_PVTEC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^/([OTEX])\.([A-Z]{3})\.([A-Z]{4})\.([A-Z]{2})\.([A-Z])\.([0-9]{4})\.([0-9]{6}T[0-9]{4}Z)-([0-9]{6}T[0-9]{4}Z)/",
    )
    .expect("P-VTEC regex is valid")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PVtec {
    /// Product class: operational, test, experimental, experimental-VTEC
    pub fixed_identifier: char,
    /// Action code, e.g. `NEW`, `CON`, `CAN`, `EXP`
    pub action: String,
    /// Issuing office
    pub office_id: String,
    /// Phenomenon code, e.g. `SV`, `TO`, `FF`
    pub phenomenon: String,
    /// Significance code, e.g. `W` (warning), `A` (watch)
    pub significance: String,
    pub event_tracking_number: u16,
    /// Event begin time; `None` for the all-zero "until further notice" form
    pub event_begin: Option<DateTime<Utc>>,
    /// Event end time; `None` for the all-zero form
    pub event_end: Option<DateTime<Utc>>,
}

fn parse_vtec_time(s: &str) -> Result<Option<DateTime<Utc>>, DecodeError> {
    if s == "000000T0000Z" {
        return Ok(None);
    }

    NaiveDateTime::parse_from_str(s, "%y%m%dT%H%MZ")
        .map(|t| Some(t.and_utc()))
        .map_err(|_| DecodeError::Malformed(format!("bad VTEC time: {s}")))
}

impl PVtec {
    /// Whether a line is keyed as a P-VTEC string
    pub fn is_keyed(line: &str) -> bool {
        static RE_KEY: LazyLock<Regex> =
            LazyLock::new(|| Regex::new(r"^/[OTEX]\.").expect("P-VTEC key regex is valid"));
        RE_KEY.is_match(line)
    }

    pub fn parse(line: &str) -> Result<Self, DecodeError> {
        let captures = RE_PVTEC
            .captures(line)
            .ok_or_else(|| DecodeError::Malformed(format!("bad P-VTEC string: {line}")))?;

        let event_tracking_number = captures[6]
            .parse::<u16>()
            .map_err(|_| DecodeError::Malformed("bad event tracking number".into()))?;

        Ok(PVtec {
            fixed_identifier: captures[1]
                .chars()
                .next()
                .unwrap_or('O'),
            action: captures[2].to_string(),
            office_id: captures[3].to_string(),
            phenomenon: captures[4].to_string(),
            significance: captures[5].to_string(),
            event_tracking_number,
            event_begin: parse_vtec_time(&captures[7])?,
            event_end: parse_vtec_time(&captures[8])?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_severe_thunderstorm_warning() {
        let vtec =
            PVtec::parse("/O.NEW.KLSX.SV.W.0001.250101T0000Z-250101T0100Z/").unwrap();

        assert_eq!(vtec.fixed_identifier, 'O');
        assert_eq!(vtec.action, "NEW");
        assert_eq!(vtec.office_id, "KLSX");
        assert_eq!(vtec.phenomenon, "SV");
        assert_eq!(vtec.significance, "W");
        assert_eq!(vtec.event_tracking_number, 1);
        assert_eq!(
            vtec.event_begin,
            Some(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(
            vtec.event_end,
            Some(Utc.with_ymd_and_hms(2025, 1, 1, 1, 0, 0).unwrap())
        );
    }

    #[test]
    fn zero_begin_time_is_until_further_notice() {
        let vtec =
            PVtec::parse("/O.CON.KEAX.FL.W.0042.000000T0000Z-250315T1800Z/").unwrap();
        assert_eq!(vtec.event_begin, None);
        assert!(vtec.event_end.is_some());
    }

    #[test]
    fn keying_matches_product_classes() {
        assert!(PVtec::is_keyed("/O.NEW.KLSX.SV.W.0001.250101T0000Z-250101T0100Z/"));
        assert!(PVtec::is_keyed("/T.NEW.KLSX.SV.W.0001.250101T0000Z-250101T0100Z/"));
        assert!(!PVtec::is_keyed("/KCLNM7.1.ER.250101T0000Z.250101T0100Z.250101T0200Z.NO/"));
        assert!(!PVtec::is_keyed("MOC183-187-010100-"));
    }

    #[test]
    fn malformed_string_is_rejected() {
        assert!(PVtec::parse("/O.NEW.KLSX.SV.W.00AB.250101T0000Z-250101T0100Z/").is_err());
        assert!(PVtec::parse("garbage").is_err());
    }
}
