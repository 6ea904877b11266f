//! Discovery & ranking: trending, nearby, and text search.
//!
//! All discovery surfaces operate on public pins only, independent of the
//! viewer. This is a narrower policy than the general visibility rules.

use std::cmp::Ordering;

use serde::Serialize;

use waymark_shared::constants::{
    DEFAULT_NEARBY_RADIUS_KM, DISCOVER_LIMIT, KM_PER_DEGREE, SEARCH_LIMIT, USER_SEARCH_LIMIT,
};
use waymark_shared::Viewer;
use waymark_store::{Event, Pin};

use crate::error::Result;
use crate::friends::UserProfile;
use crate::SharedDatabase;

/// A public pin annotated with its distance from the query point, rounded
/// to two decimals.
#[derive(Debug, Clone, Serialize)]
pub struct NearbyPin {
    #[serde(flatten)]
    pub pin: Pin,
    pub distance: f64,
}

/// Planar distance approximation in kilometers: degrees of latitude and
/// longitude are treated as equal-length axes at 111 km per degree. This is
/// NOT great-circle distance, and must stay this way for ranking parity.
pub fn planar_distance_km(lat_a: f64, lng_a: f64, lat_b: f64, lng_b: f64) -> f64 {
    let lat_diff = (lat_a - lat_b).abs();
    let lng_diff = (lng_a - lng_b).abs();
    (lat_diff * lat_diff + lng_diff * lng_diff).sqrt() * KM_PER_DEGREE
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub struct DiscoveryService {
    db: SharedDatabase,
}

impl DiscoveryService {
    pub fn new(db: SharedDatabase) -> Self {
        Self { db }
    }

    /// Public pins ranked by like count, then recency. Limit 50.
    pub async fn trending(&self) -> Result<Vec<Pin>> {
        let mut pins = {
            let db = self.db.lock().await;
            db.list_public_pins()?
        };

        pins.sort_by(|a, b| {
            b.like_count()
                .cmp(&a.like_count())
                .then(b.created_at.cmp(&a.created_at))
        });
        pins.truncate(DISCOVER_LIMIT);
        Ok(pins)
    }

    /// Public pins within `radius_km` (default 10) of the query point,
    /// nearest first. Distances are rounded to two decimals before the
    /// (stable) sort, so ties keep store order. Limit 50.
    pub async fn nearby(&self, lat: f64, lng: f64, radius_km: Option<f64>) -> Result<Vec<NearbyPin>> {
        let radius = radius_km.unwrap_or(DEFAULT_NEARBY_RADIUS_KM);
        let pins = {
            let db = self.db.lock().await;
            db.list_public_pins()?
        };

        let mut nearby: Vec<NearbyPin> = pins
            .into_iter()
            .filter_map(|pin| {
                let distance = planar_distance_km(pin.latitude, pin.longitude, lat, lng);
                (distance <= radius).then(|| NearbyPin {
                    distance: round2(distance),
                    pin,
                })
            })
            .collect();

        nearby.sort_by(|a, b| a.distance.partial_cmp(&b.distance).unwrap_or(Ordering::Equal));
        nearby.truncate(DISCOVER_LIMIT);
        Ok(nearby)
    }

    /// Case-insensitive substring search over public pins' title and
    /// description, newest first. Limit 50.
    pub async fn search_pins(&self, term: &str) -> Result<Vec<Pin>> {
        let db = self.db.lock().await;
        Ok(db.search_public_pins(term, SEARCH_LIMIT)?)
    }

    /// Case-insensitive substring search over event title, description,
    /// and location name, soonest first. Limit 50.
    pub async fn search_events(&self, term: &str) -> Result<Vec<Event>> {
        let db = self.db.lock().await;
        Ok(db.search_events(term, SEARCH_LIMIT)?)
    }

    /// Case-insensitive substring search over username and email, excluding
    /// the searcher, in natural store order. Limit 20.
    pub async fn search_users(&self, viewer: &Viewer, term: &str) -> Result<Vec<UserProfile>> {
        let db = self.db.lock().await;
        let users = db.search_users(term, viewer.id, USER_SEARCH_LIMIT)?;
        Ok(users.into_iter().map(UserProfile::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::sync::Arc;

    use chrono::{DateTime, Duration, Utc};
    use tokio::sync::Mutex;
    use uuid::Uuid;

    use waymark_shared::Privacy;
    use waymark_store::Database;

    use super::*;

    fn test_db() -> SharedDatabase {
        Arc::new(Mutex::new(Database::open_in_memory().unwrap()))
    }

    fn pin_at(
        title: &str,
        privacy: Privacy,
        lat: f64,
        lng: f64,
        likes: usize,
        created_at: DateTime<Utc>,
    ) -> Pin {
        Pin {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            username: "owner".to_string(),
            title: title.to_string(),
            description: String::new(),
            latitude: lat,
            longitude: lng,
            privacy,
            likes: (0..likes).map(|_| Uuid::new_v4()).collect(),
            comments: Vec::new(),
            media_count: 0,
            created_at,
        }
    }

    #[test]
    fn planar_formula_exact_value() {
        // With exact axis deltas the computation is bit-for-bit
        // sqrt(Δlat² + Δlng²) × 111.
        let x = 0.0001f64;
        let expected = (x * x + x * x).sqrt() * 111.0;
        assert_eq!(planar_distance_km(0.0, 0.0, x, x), expected);

        // Pin at (37.7749, -122.4194), query at (37.7750, -122.4195):
        // sqrt(0.0001² + 0.0001²) × 111 ≈ 0.0157 km, rounded to 0.02.
        let d = planar_distance_km(37.7749, -122.4194, 37.7750, -122.4195);
        assert!((d - 0.0157).abs() < 0.0005);
        assert_eq!(round2(d), 0.02);
    }

    #[tokio::test]
    async fn trending_ranks_by_likes_then_recency() {
        let db = test_db();
        let service = DiscoveryService::new(db.clone());
        let t0 = Utc::now();

        let five_likes = pin_at("five", Privacy::Public, 0.0, 0.0, 5, t0);
        let three_likes = pin_at("three", Privacy::Public, 0.0, 0.0, 3, t0 + Duration::hours(1));
        let newer_three = pin_at(
            "newer three",
            Privacy::Public,
            0.0,
            0.0,
            3,
            t0 + Duration::hours(2),
        );
        let private_many = pin_at("private", Privacy::Private, 0.0, 0.0, 9, t0);
        for p in [&five_likes, &three_likes, &newer_three, &private_many] {
            db.lock().await.insert_pin(p).unwrap();
        }

        let trending = service.trending().await.unwrap();
        let titles: Vec<&str> = trending.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["five", "newer three", "three"]);
    }

    #[tokio::test]
    async fn nearby_filters_sorts_and_rounds() {
        let db = test_db();
        let service = DiscoveryService::new(db.clone());
        let now = Utc::now();

        let close = pin_at("close", Privacy::Public, 37.7750, -122.4195, 0, now);
        let closer = pin_at("closer", Privacy::Public, 37.7749, -122.4194, 0, now);
        let far = pin_at("far", Privacy::Public, 38.7749, -122.4194, 0, now);
        let private_close = pin_at("hidden", Privacy::Private, 37.7749, -122.4194, 0, now);
        for p in [&close, &closer, &far, &private_close] {
            db.lock().await.insert_pin(p).unwrap();
        }

        let nearby = service
            .nearby(37.7749, -122.4194, Some(1.0))
            .await
            .unwrap();
        let titles: Vec<&str> = nearby.iter().map(|n| n.pin.title.as_str()).collect();
        assert_eq!(titles, vec!["closer", "close"]);
        assert_eq!(nearby[0].distance, 0.0);
        assert_eq!(nearby[1].distance, 0.02);
    }

    #[tokio::test]
    async fn nearby_default_radius_is_ten_km() {
        let db = test_db();
        let service = DiscoveryService::new(db.clone());

        // 0.05° ≈ 5.6 km away: inside the default radius.
        let inside = pin_at("inside", Privacy::Public, 37.05, -122.0, 0, Utc::now());
        // 0.1° on both axes ≈ 15.7 km away: outside.
        let outside = pin_at("outside", Privacy::Public, 37.1, -122.1, 0, Utc::now());
        db.lock().await.insert_pin(&inside).unwrap();
        db.lock().await.insert_pin(&outside).unwrap();

        let nearby = service.nearby(37.0, -122.0, None).await.unwrap();
        assert_eq!(nearby.len(), 1);
        assert_eq!(nearby[0].pin.title, "inside");
    }

    #[tokio::test]
    async fn trending_caps_at_limit() {
        let db = test_db();
        let service = DiscoveryService::new(db.clone());
        for i in 0..(DISCOVER_LIMIT + 5) {
            let p = pin_at(&format!("pin {i}"), Privacy::Public, 0.0, 0.0, 0, Utc::now());
            db.lock().await.insert_pin(&p).unwrap();
        }
        assert_eq!(service.trending().await.unwrap().len(), DISCOVER_LIMIT);
    }
}
