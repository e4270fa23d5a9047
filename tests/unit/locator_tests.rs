#[path = "../common/mod.rs"]
mod common;

use podtato::discovery::{
    DiscoverySettings, ExternalLocator, LocalLocator, LocatorError, LocatorStrategy,
    ServiceLocator,
};
use podtato::domain::{BodyPart, Role};
use proptest::prelude::*;

fn fake_env(key: &str) -> Option<String> {
    match key {
        "PODTATO_HEAD_HAT_SERVICE_HOST" => Some("hat.podtato.svc".to_string()),
        "PODTATO_HEAD_HAT_SERVICE_PORT" => Some("9001".to_string()),
        "PODTATO_HEAD_LEFT_ARM_SERVICE_HOST" => Some("left-arm.podtato.svc".to_string()),
        "PODTATO_HEAD_LEFT_ARM_SERVICE_PORT" => Some("9003".to_string()),
        _ => None,
    }
}

#[test]
fn local_locator_maps_left_arm_to_plus_three() {
    let locator = LocalLocator::new("localhost", 9000).expect("locator");
    assert_eq!(
        locator.resolve("left-arm").expect("left-arm"),
        "http://localhost:9003"
    );
    assert_eq!(locator.strategy(), "local");
}

#[test]
fn local_locator_rejects_unknown_names() {
    let locator = LocalLocator::new("localhost", 9000).expect("locator");
    for name in ["torso", "", "frontend", "Hat"] {
        assert!(
            matches!(
                locator.resolve(name),
                Err(LocatorError::UnknownService { .. })
            ),
            "`{name}` should be unknown"
        );
    }
}

proptest! {
    #[test]
    fn local_resolution_is_a_pure_function_of_port_and_name(port in 0u16..=65530, index in 0usize..5) {
        let part = BodyPart::ALL[index];
        let first = LocalLocator::new("localhost", port).expect("locator");
        let second = LocalLocator::new("localhost", port).expect("locator");

        let url = first.resolve(part.as_str()).expect("resolves");
        prop_assert_eq!(&url, &second.resolve(part.as_str()).expect("resolves"));
        prop_assert_eq!(
            url,
            format!("http://localhost:{}", port + LocalLocator::offset_of(part))
        );
    }
}

#[test]
fn strategy_follows_role() {
    let settings = DiscoverySettings::default();
    assert_eq!(
        LocatorStrategy::for_role(&Role::Monolith, 9000, &settings).label(),
        "local"
    );
    assert_eq!(
        LocatorStrategy::for_role(&Role::Frontend, 9000, &settings).label(),
        "external"
    );
    assert_eq!(
        LocatorStrategy::for_role(&Role::Part("hat".to_string()), 9000, &settings).label(),
        "external"
    );
}

#[test]
fn external_locator_fails_for_unconfigured_names() {
    let locator = ExternalLocator::from_entries([("hat", "http://hat:9001")]);
    assert!(matches!(
        locator.resolve("right-leg"),
        Err(LocatorError::ResolutionFailed { service }) if service == "right-leg"
    ));
}

#[test]
fn external_locator_trims_trailing_slashes() {
    let locator = ExternalLocator::from_entries([("hat", " http://hat:9001/ ")]);
    assert_eq!(locator.resolve("hat").expect("hat"), "http://hat:9001");
}

#[test]
fn services_file_wins_over_environment() {
    let path = common::scratch_path("services");
    std::fs::write(&path, "hat: http://hat-from-file:7001/\n").expect("write services file");

    let settings = DiscoverySettings {
        services_file: Some(path.clone()),
        ..DiscoverySettings::default()
    };
    let locator = ExternalLocator::discover_with(&settings, fake_env).expect("discover");

    assert_eq!(locator.resolve("hat").expect("hat"), "http://hat-from-file:7001");
    assert_eq!(
        locator.resolve("left-arm").expect("left-arm"),
        "http://left-arm.podtato.svc:9003"
    );
    assert!(locator.resolve("right-arm").is_err());

    let _ = std::fs::remove_file(path);
}

#[test]
fn missing_services_file_makes_the_directory_unavailable() {
    let settings = DiscoverySettings {
        services_file: Some(common::scratch_path("absent")),
        ..DiscoverySettings::default()
    };
    assert!(matches!(
        ExternalLocator::discover_with(&settings, fake_env),
        Err(LocatorError::DirectoryUnavailable { .. })
    ));
}

#[test]
fn malformed_services_file_is_unavailable_too() {
    let path = common::scratch_path("malformed");
    std::fs::write(&path, "- just\n- a list\n").expect("write services file");
    let settings = DiscoverySettings {
        services_file: Some(path.clone()),
        ..DiscoverySettings::default()
    };
    assert!(matches!(
        ExternalLocator::discover_with(&settings, fake_env),
        Err(LocatorError::DirectoryUnavailable { .. })
    ));
    let _ = std::fs::remove_file(path);
}
