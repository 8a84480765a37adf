//! Column layout of the visit sheet.

use canvass_core::{Coordinate, VisitRecord};
use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};

/// Header row written when the visit sheet is first created.
pub const VISIT_HEADER: [&str; 13] = [
    "Timestamp",
    "Waktu Kunjungan",
    "Nama Sales",
    "Nama Toko",
    "Nama PIC",
    "No Telp",
    "Kec",
    "Kota",
    "Provinsi",
    "Status",
    "Link Foto",
    "Lat/Long",
    "Keterangan",
];

/// Asia/Jakarta (WIB) has no DST.
const JAKARTA_UTC_OFFSET_SECS: i32 = 7 * 3600;

#[must_use]
pub fn maps_url(coord: Coordinate) -> String {
    format!(
        "https://www.google.com/maps/search/?api=1&query={},{}",
        coord.lat, coord.lng
    )
}

/// `YYYY-MM-DD HH:MM:SS` in Jakarta local time.
#[must_use]
pub fn jakarta_time(now: DateTime<Utc>) -> String {
    let local = FixedOffset::east_opt(JAKARTA_UTC_OFFSET_SECS)
        .map_or_else(|| now.fixed_offset(), |offset| now.with_timezone(&offset));
    local.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Cells for one visit, in [`VISIT_HEADER`] order.
#[must_use]
pub fn to_row(record: &VisitRecord, now: DateTime<Utc>) -> Vec<String> {
    vec![
        now.to_rfc3339_opts(SecondsFormat::Millis, true),
        jakarta_time(now),
        record.salesperson.clone(),
        record.store_name.clone(),
        record.contact_name.clone(),
        record.phone.clone(),
        record.district.clone(),
        record.city.clone(),
        record.province.clone(),
        record.visit_status.clone(),
        record.photo_link.clone(),
        maps_url(record.coordinate),
        record.notes.clone(),
    ]
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn record() -> VisitRecord {
        VisitRecord {
            salesperson: "Budi Santoso".into(),
            store_name: "Toko Makmur".into(),
            contact_name: "Ibu Sari".into(),
            phone: "081234567890".into(),
            city: "Jakarta Pusat".into(),
            district: "Gambir".into(),
            province: "DKI Jakarta".into(),
            visit_status: "Follow-Up".into(),
            notes: String::new(),
            photo_link: "https://drive.google.com/file/d/x/view".into(),
            coordinate: Coordinate {
                lat: -6.175392,
                lng: 106.827153,
            },
        }
    }

    #[test]
    fn row_matches_header_layout() {
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 18, 30, 5).unwrap();
        let row = to_row(&record(), now);
        assert_eq!(row.len(), VISIT_HEADER.len());
        assert_eq!(row[0], "2025-03-01T18:30:05.000Z");
        assert_eq!(row[1], "2025-03-02 01:30:05", "Jakarta is UTC+7");
        assert_eq!(row[5], "081234567890");
        assert_eq!(row[6], "Gambir");
        assert_eq!(row[7], "Jakarta Pusat");
        assert_eq!(
            row[11],
            "https://www.google.com/maps/search/?api=1&query=-6.175392,106.827153"
        );
        assert_eq!(row[12], "");
    }

    #[test]
    fn jakarta_time_crosses_year_boundary() {
        let now = Utc.with_ymd_and_hms(2024, 12, 31, 17, 0, 0).unwrap();
        assert_eq!(jakarta_time(now), "2025-01-01 00:00:00");
        let before = Utc.with_ymd_and_hms(2024, 12, 31, 16, 59, 59).unwrap();
        assert_eq!(jakarta_time(before), "2024-12-31 23:59:59");
    }

    #[test]
    fn maps_url_for_manual_origin() {
        assert_eq!(
            maps_url(Coordinate::ORIGIN),
            "https://www.google.com/maps/search/?api=1&query=0,0"
        );
    }
}
