use httpmock::prelude::*;
use wound_aid::adapters::PlacesHospitalFinder;
use wound_aid::config::{HttpConfig, PlacesConfig};
use wound_aid::domain::model::{Coordinates, HospitalSearch};
use wound_aid::domain::ports::HospitalFinder;

fn finder(server: &MockServer) -> PlacesHospitalFinder {
    let config = PlacesConfig {
        endpoint: server.url("/maps/api/place/nearbysearch/json"),
        api_key: "maps-key".to_string(),
        ..PlacesConfig::default()
    };
    PlacesHospitalFinder::new(&config, &HttpConfig::default()).unwrap()
}

#[tokio::test]
async fn test_nearby_hospitals_are_filtered_by_category() {
    let server = MockServer::start();
    let api_mock = server.mock(|when, then| {
        when.method(GET)
            .path("/maps/api/place/nearbysearch/json")
            .query_param("location", "19.07,72.87")
            .query_param("radius", "5000")
            .query_param("type", "hospital")
            .query_param("key", "maps-key");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(serde_json::json!({
                "status": "OK",
                "results": [
                    {
                        "name": "Lilavati Hospital",
                        "vicinity": "Bandra West, Mumbai",
                        "place_id": "p1",
                        "types": ["hospital", "health", "point_of_interest"]
                    },
                    {
                        "name": "Wellness Pharmacy",
                        "vicinity": "Bandra West, Mumbai",
                        "place_id": "p2",
                        "types": ["pharmacy", "health"]
                    },
                    {
                        "name": "Hinduja Hospital",
                        "vicinity": "Mahim, Mumbai",
                        "place_id": "p3",
                        "types": ["hospital"]
                    }
                ]
            }));
    });

    let search = finder(&server)
        .find_hospitals(&Coordinates::new(19.07, 72.87), 5000)
        .await;

    api_mock.assert();
    let records = search.records();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].name, "Lilavati Hospital");
    assert_eq!(records[0].address, "Bandra West, Mumbai");
    assert_eq!(
        records[0].map_link,
        "https://www.google.com/maps/search/?q=Hospital+Lilavati+Hospital&hl=en"
    );
    assert!(records.iter().all(|r| r.name != "Wellness Pharmacy"));
}

#[tokio::test]
async fn test_non_success_status_is_unavailable_not_error() {
    let server = MockServer::start();
    let api_mock = server.mock(|when, then| {
        when.method(GET).path("/maps/api/place/nearbysearch/json");
        then.status(500);
    });

    let search = finder(&server)
        .find_hospitals(&Coordinates::new(19.07, 72.87), 5000)
        .await;

    api_mock.assert();
    assert!(matches!(search, HospitalSearch::Unavailable(_)));
    assert!(search.records().is_empty());
}

#[tokio::test]
async fn test_zero_results_is_empty() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/maps/api/place/nearbysearch/json");
        then.status(200)
            .json_body(serde_json::json!({ "status": "ZERO_RESULTS", "results": [] }));
    });

    let search = finder(&server)
        .find_hospitals(&Coordinates::new(0.0, 0.0), 1000)
        .await;

    assert_eq!(search, HospitalSearch::Empty);
}

#[tokio::test]
async fn test_request_denied_is_unavailable() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/maps/api/place/nearbysearch/json");
        then.status(200).json_body(serde_json::json!({
            "status": "REQUEST_DENIED",
            "error_message": "The provided API key is invalid.",
            "results": []
        }));
    });

    let search = finder(&server)
        .find_hospitals(&Coordinates::new(19.07, 72.87), 5000)
        .await;

    match search {
        HospitalSearch::Unavailable(reason) => {
            assert!(reason.starts_with("REQUEST_DENIED"));
            assert!(reason.contains("API key is invalid"));
        }
        other => panic!("expected Unavailable, got {:?}", other),
    }
}

#[tokio::test]
async fn test_connection_failure_does_not_expose_api_key() {
    let address = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };
    let config = PlacesConfig {
        endpoint: format!("http://{}/nearby", address),
        api_key: "SECRET-MAPS-KEY".to_string(),
        ..PlacesConfig::default()
    };
    let finder = PlacesHospitalFinder::new(&config, &HttpConfig::default()).unwrap();

    let search = finder
        .find_hospitals(&Coordinates::new(1.0, 2.0), 5000)
        .await;

    match search {
        HospitalSearch::Unavailable(reason) => {
            assert!(reason.starts_with("request failed"));
            assert!(!reason.contains("SECRET-MAPS-KEY"));
        }
        other => panic!("expected Unavailable, got {:?}", other),
    }
}
