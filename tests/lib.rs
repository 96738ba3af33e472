//! Tests for core types and configuration

use signalmatch::{
    Bounds, EngineConfig, GeoPoint, MatchConfig, SignalMatchError, SignalRecord, Zone, ZoneConfig,
};

#[test]
fn test_geo_point_validity() {
    assert!(GeoPoint::new(51.5074, -0.1278).is_valid());
    assert!(GeoPoint::new(90.0, 180.0).is_valid());
    assert!(GeoPoint::new(-90.0, -180.0).is_valid());

    assert!(!GeoPoint::new(91.0, 0.0).is_valid());
    assert!(!GeoPoint::new(0.0, 180.5).is_valid());
    assert!(!GeoPoint::new(f64::NAN, 0.0).is_valid());
    assert!(!GeoPoint::new(0.0, f64::INFINITY).is_valid());
}

#[test]
fn test_geo_point_accepts_short_field_names() {
    let p: GeoPoint = serde_json::from_str(r#"{"lat": 1.5, "lng": 2.5}"#).unwrap();
    assert_eq!(p, GeoPoint::new(1.5, 2.5));
    let p: GeoPoint = serde_json::from_str(r#"{"latitude": 1.5, "lon": 2.5}"#).unwrap();
    assert_eq!(p, GeoPoint::new(1.5, 2.5));
}

#[test]
fn test_bounds_from_points() {
    assert!(Bounds::from_points(&[]).is_none());
    let bounds =
        Bounds::from_points(&[GeoPoint::new(1.0, 1.0), GeoPoint::new(3.0, 5.0)]).unwrap();
    assert_eq!(bounds.center(), GeoPoint::new(2.0, 3.0));
    assert!(bounds.contains(&GeoPoint::new(2.0, 2.0)));
    assert!(!bounds.contains(&GeoPoint::new(4.0, 2.0)));
}

#[test]
fn test_config_defaults() {
    let matching = MatchConfig::default();
    assert_eq!(matching.corridor_radius_meters, 50.0);
    assert_eq!(matching.max_results, 0);
    assert_eq!(matching.deadline_ms, None);

    let zones = ZoneConfig::default();
    assert_eq!(zones.target_radius_meters, 1000.0);
    assert_eq!(zones.max_iterations, 20);
}

#[test]
fn test_config_validation() {
    assert!(MatchConfig::with_radius(0.0).validate().is_err());
    assert!(MatchConfig::with_radius(f64::NAN).validate().is_err());
    assert!(ZoneConfig::with_radius(-1.0).validate().is_err());
    assert!(ZoneConfig::with_radius(250.0).validate().is_ok());
}

#[test]
fn test_engine_config_from_json_fills_defaults() {
    let config = EngineConfig::from_json_str(r#"{"matching": {"corridor_radius_meters": 80}}"#)
        .unwrap();
    assert_eq!(config.matching.corridor_radius_meters, 80.0);
    assert_eq!(config.matching.max_results, 0);
    assert_eq!(config.zones, ZoneConfig::default());

    let empty = EngineConfig::from_json_str("{}").unwrap();
    assert_eq!(empty, EngineConfig::default());
}

#[test]
fn test_engine_config_rejects_bad_values() {
    let result = EngineConfig::from_json_str(r#"{"zones": {"target_radius_meters": 0}}"#);
    assert!(matches!(
        result,
        Err(SignalMatchError::InvalidParameter {
            name: "target_radius_meters",
            ..
        })
    ));

    let result = EngineConfig::from_json_str("not json");
    assert!(matches!(result, Err(SignalMatchError::InvalidConfig { .. })));

    let result = EngineConfig::from_json_file("/nonexistent/signalmatch.json");
    assert!(matches!(result, Err(SignalMatchError::InvalidConfig { .. })));
}

#[test]
fn test_zone_boundary_is_closed_hull() {
    let members = vec![
        SignalRecord::new("a", 0.0, 0.0),
        SignalRecord::new("b", 0.0, 0.01),
        SignalRecord::new("c", 0.01, 0.01),
        SignalRecord::new("d", 0.01, 0.0),
        SignalRecord::new("inner", 0.005, 0.005),
    ];
    let points: Vec<GeoPoint> = members.iter().map(|s| s.location).collect();
    let zone = Zone {
        index: 1,
        centroid: signalmatch::geo_utils::compute_center(&points),
        bounds: Bounds::from_points(&points).unwrap(),
        radius_meters: 0.0,
        members,
    };

    let boundary = zone.boundary();
    // 4 corners plus the closing point
    assert_eq!(boundary.len(), 5);
    assert_eq!(boundary.first(), boundary.last());
    assert!(!boundary.contains(&GeoPoint::new(0.005, 0.005)));

    let summary = zone.summary();
    assert_eq!(summary.index, 1);
    assert_eq!(summary.members.len(), 5);
    assert!(zone.contains_signal("inner"));
}
