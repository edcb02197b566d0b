use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use super::{by_id, first_or_not_found, to_patch};
use crate::backend::{decode_rows, tables, DataBackend, TableQuery};
use crate::errors::ServiceError;
use crate::locale::Locale;
use crate::models::common::{normalize_optional_string, normalize_string};
use crate::models::{Ad, AdZone, CreateAdInput, CreateAdZoneInput, UpdateAdInput, UpdateAdZoneInput, ZoneWithAd};

/// An ad is live when it is switched on and `now` falls inside its optional
/// start/end window (both ends inclusive).
pub fn is_ad_active(ad: &Ad, now: DateTime<Utc>) -> bool {
    ad.is_active
        && ad.start_date.map_or(true, |start| start <= now)
        && ad.end_date.map_or(true, |end| now <= end)
}

/// Picks the ad a zone shows at `now`: highest priority wins, then the
/// earliest created.
pub fn select_zone_ad(ads: &[Ad], now: DateTime<Utc>) -> Option<Ad> {
    ads.iter()
        .filter(|ad| is_ad_active(ad, now))
        .min_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then_with(|| match (a.created_at, b.created_at) {
                    (Some(x), Some(y)) => x.cmp(&y),
                    (Some(_), None) => std::cmp::Ordering::Less,
                    (None, Some(_)) => std::cmp::Ordering::Greater,
                    (None, None) => std::cmp::Ordering::Equal,
                })
        })
        .cloned()
}

fn validate_window(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Result<(), ServiceError> {
    match (start, end) {
        (Some(start), Some(end)) if end < start => Err(ServiceError::InvalidInput(
            "end_date must not be before start_date".into(),
        )),
        _ => Ok(()),
    }
}

#[derive(Clone)]
pub struct AdService {
    backend: Arc<dyn DataBackend>,
}

impl AdService {
    pub fn new(backend: Arc<dyn DataBackend>) -> Self {
        Self { backend }
    }

    #[instrument(skip(self))]
    pub async fn list_zones(&self, locale: Locale) -> Result<Vec<AdZone>, ServiceError> {
        let query = TableQuery::new().eq("locale", locale).order_asc("name");
        Ok(decode_rows(self.backend.select(tables::CMS_AD_ZONES, &query).await?)?)
    }

    pub async fn get_zone(&self, id: Uuid) -> Result<AdZone, ServiceError> {
        let rows = self.backend.select(tables::CMS_AD_ZONES, &by_id(id)).await?;
        first_or_not_found(decode_rows(rows)?, format!("ad zone {id}"))
    }

    pub async fn get_zone_by_name(&self, locale: Locale, name: &str) -> Result<AdZone, ServiceError> {
        let query = TableQuery::new().eq("locale", locale).eq("name", name).limit(1);
        let rows = self.backend.select(tables::CMS_AD_ZONES, &query).await?;
        first_or_not_found(decode_rows(rows)?, format!("ad zone '{name}' ({locale})"))
    }

    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_zone(&self, locale: Locale, input: CreateAdZoneInput) -> Result<AdZone, ServiceError> {
        let locale = input.locale.unwrap_or(locale);
        let name = normalize_string(input.name);
        self.ensure_zone_name_free(locale, &name, None).await?;
        let row = json!({
            "locale": locale,
            "name": name,
            "description": normalize_optional_string(input.description),
            "width": input.width,
            "height": input.height,
        });
        let zone: AdZone = serde_json::from_value(self.backend.insert(tables::CMS_AD_ZONES, row).await?)?;
        info!("Created ad zone: {}", zone.id);
        Ok(zone)
    }

    #[instrument(skip(self, input))]
    pub async fn update_zone(&self, id: Uuid, mut input: UpdateAdZoneInput) -> Result<AdZone, ServiceError> {
        let existing = self.get_zone(id).await?;
        if let Some(name) = input.name.take().map(normalize_string) {
            self.ensure_zone_name_free(existing.locale, &name, Some(id)).await?;
            input.name = Some(name);
        }
        let patch = to_patch(&input)?;
        if patch.is_empty() {
            return Ok(existing);
        }
        let rows = self
            .backend
            .update(tables::CMS_AD_ZONES, &by_id(id), Value::Object(patch))
            .await?;
        first_or_not_found(decode_rows(rows)?, format!("ad zone {id}"))
    }

    /// Zone names are unique per locale; `exclude` skips the zone being renamed.
    async fn ensure_zone_name_free(&self, locale: Locale, name: &str, exclude: Option<Uuid>) -> Result<(), ServiceError> {
        let rows = self
            .backend
            .select(tables::CMS_AD_ZONES, &TableQuery::new().eq("locale", locale).eq("name", name))
            .await?;
        let taken = decode_rows::<AdZone>(rows)?
            .iter()
            .any(|zone| Some(zone.id) != exclude);
        if taken {
            return Err(ServiceError::Conflict(format!("ad zone '{name}' already exists ({locale})")));
        }
        Ok(())
    }

    /// Deletes the zone together with its ads.
    #[instrument(skip(self))]
    pub async fn delete_zone(&self, id: Uuid) -> Result<(), ServiceError> {
        self.get_zone(id).await?;
        self.backend
            .delete(tables::CMS_ADS, &TableQuery::new().eq("zone_id", id))
            .await?;
        self.backend.delete(tables::CMS_AD_ZONES, &by_id(id)).await?;
        info!("Deleted ad zone: {}", id);
        Ok(())
    }

    pub async fn list_ads(&self, zone_id: Uuid) -> Result<Vec<Ad>, ServiceError> {
        let query = TableQuery::new()
            .eq("zone_id", zone_id)
            .order_desc("priority")
            .order_asc("created_at");
        Ok(decode_rows(self.backend.select(tables::CMS_ADS, &query).await?)?)
    }

    pub async fn get_ad(&self, id: Uuid) -> Result<Ad, ServiceError> {
        let rows = self.backend.select(tables::CMS_ADS, &by_id(id)).await?;
        first_or_not_found(decode_rows(rows)?, format!("ad {id}"))
    }

    #[instrument(skip(self, input), fields(title = %input.title))]
    pub async fn create_ad(&self, zone_id: Uuid, input: CreateAdInput) -> Result<Ad, ServiceError> {
        let zone = self.get_zone(zone_id).await?;
        validate_window(input.start_date, input.end_date)?;
        let row = json!({
            "zone_id": zone_id,
            "locale": zone.locale,
            "title": normalize_string(input.title),
            "image_url": input.image_url.trim(),
            "link_url": normalize_optional_string(input.link_url),
            "is_active": input.is_active,
            "start_date": input.start_date,
            "end_date": input.end_date,
            "priority": input.priority,
        });
        let ad: Ad = serde_json::from_value(self.backend.insert(tables::CMS_ADS, row).await?)?;
        info!("Created ad {} in zone {}", ad.id, zone_id);
        Ok(ad)
    }

    #[instrument(skip(self, input))]
    pub async fn update_ad(&self, id: Uuid, input: UpdateAdInput) -> Result<Ad, ServiceError> {
        let existing = self.get_ad(id).await?;
        let start = input.start_date.unwrap_or(existing.start_date);
        let end = input.end_date.unwrap_or(existing.end_date);
        validate_window(start, end)?;

        let mut patch = Map::new();
        if let Some(title) = input.title {
            patch.insert("title".into(), json!(normalize_string(title)));
        }
        if let Some(image_url) = input.image_url {
            patch.insert("image_url".into(), json!(image_url.trim()));
        }
        if let Some(link_url) = input.link_url {
            patch.insert("link_url".into(), json!(normalize_optional_string(Some(link_url))));
        }
        if let Some(is_active) = input.is_active {
            patch.insert("is_active".into(), json!(is_active));
        }
        if let Some(start_date) = input.start_date {
            patch.insert("start_date".into(), json!(start_date));
        }
        if let Some(end_date) = input.end_date {
            patch.insert("end_date".into(), json!(end_date));
        }
        if let Some(priority) = input.priority {
            patch.insert("priority".into(), json!(priority));
        }
        if patch.is_empty() {
            return Ok(existing);
        }
        let rows = self
            .backend
            .update(tables::CMS_ADS, &by_id(id), Value::Object(patch))
            .await?;
        first_or_not_found(decode_rows(rows)?, format!("ad {id}"))
    }

    #[instrument(skip(self))]
    pub async fn delete_ad(&self, id: Uuid) -> Result<(), ServiceError> {
        self.get_ad(id).await?;
        self.backend.delete(tables::CMS_ADS, &by_id(id)).await?;
        info!("Deleted ad: {}", id);
        Ok(())
    }

    /// The ad `zone` shows at `now`, if any. Only switched-on ads are
    /// fetched; the date window is checked here.
    #[instrument(skip(self, zone), fields(zone = %zone.name))]
    pub async fn resolve_zone_ad(&self, zone: &AdZone, now: DateTime<Utc>) -> Result<Option<Ad>, ServiceError> {
        let query = TableQuery::new().eq("zone_id", zone.id).eq("is_active", true);
        let ads: Vec<Ad> = decode_rows(self.backend.select(tables::CMS_ADS, &query).await?)?;
        Ok(select_zone_ad(&ads, now))
    }

    pub async fn zone_with_ad(&self, locale: Locale, name: &str, now: DateTime<Utc>) -> Result<ZoneWithAd, ServiceError> {
        let zone = self.get_zone_by_name(locale, name).await?;
        let ad = self.resolve_zone_ad(&zone, now).await?;
        Ok(ZoneWithAd { zone, ad })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use assert_matches::assert_matches;
    use chrono::{Duration, TimeZone};
    use rstest::rstest;

    fn ad(priority: i32, created_offset_min: i64) -> Ad {
        let base = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        Ad {
            id: Uuid::new_v4(),
            zone_id: Uuid::nil(),
            locale: Locale::En,
            title: format!("p{priority}"),
            image_url: "https://cdn.test/ad.jpg".into(),
            link_url: None,
            is_active: true,
            start_date: None,
            end_date: None,
            priority,
            created_at: Some(base + Duration::minutes(created_offset_min)),
        }
    }

    #[rstest]
    #[case(None, None, true)]
    #[case(Some(-1), None, true)]
    #[case(Some(0), Some(0), true)]
    #[case(Some(1), None, false)]
    #[case(None, Some(-1), false)]
    fn active_window_is_inclusive(#[case] start: Option<i64>, #[case] end: Option<i64>, #[case] expected: bool) {
        let now = Utc.with_ymd_and_hms(2025, 3, 10, 0, 0, 0).unwrap();
        let mut candidate = ad(0, 0);
        candidate.start_date = start.map(|d| now + Duration::days(d));
        candidate.end_date = end.map(|d| now + Duration::days(d));
        assert_eq!(is_ad_active(&candidate, now), expected);
        candidate.is_active = false;
        assert!(!is_ad_active(&candidate, now));
    }

    #[test]
    fn highest_priority_then_oldest_wins() {
        let now = Utc::now();
        let newer_top = ad(5, 10);
        let older_top = ad(5, 0);
        let low = ad(1, -100);
        let chosen = select_zone_ad(&[low, newer_top, older_top.clone()], now).unwrap();
        assert_eq!(chosen.id, older_top.id);
        assert!(select_zone_ad(&[], now).is_none());
    }

    #[tokio::test]
    async fn zone_resolves_its_live_ad() {
        let service = AdService::new(Arc::new(MemoryBackend::new()));
        let zone = service
            .create_zone(Locale::Ar, serde_json::from_value(json!({ "name": "home-sidebar" })).unwrap())
            .await
            .unwrap();
        let now = Utc::now();
        let expired: CreateAdInput = serde_json::from_value(json!({
            "title": "Old",
            "image_url": "https://cdn.test/old.jpg",
            "priority": 9,
            "end_date": now - Duration::days(1),
        }))
        .unwrap();
        let live: CreateAdInput = serde_json::from_value(json!({
            "title": "Live",
            "image_url": "https://cdn.test/live.jpg",
            "priority": 1,
        }))
        .unwrap();
        service.create_ad(zone.id, expired).await.unwrap();
        service.create_ad(zone.id, live).await.unwrap();

        let resolved = service.zone_with_ad(Locale::Ar, "home-sidebar", now).await.unwrap();
        assert_eq!(resolved.ad.map(|a| a.title), Some("Live".to_string()));
        assert_matches!(
            service.zone_with_ad(Locale::En, "home-sidebar", now).await,
            Err(ServiceError::NotFound(_))
        );
    }

    #[tokio::test]
    async fn renaming_onto_a_taken_zone_name_conflicts() {
        let service = AdService::new(Arc::new(MemoryBackend::new()));
        let zone = |name: &str| serde_json::from_value::<CreateAdZoneInput>(json!({ "name": name })).unwrap();
        service.create_zone(Locale::En, zone("sidebar")).await.unwrap();
        let footer = service.create_zone(Locale::En, zone("footer")).await.unwrap();
        service.create_zone(Locale::Ar, zone("banner")).await.unwrap();

        let rename = |name: &str| serde_json::from_value::<UpdateAdZoneInput>(json!({ "name": name })).unwrap();
        assert_matches!(
            service.update_zone(footer.id, rename(" sidebar ")).await,
            Err(ServiceError::Conflict(_))
        );
        let names: Vec<String> = service
            .list_zones(Locale::En)
            .await
            .unwrap()
            .into_iter()
            .map(|z| z.name)
            .collect();
        assert_eq!(names, vec!["footer", "sidebar"]);

        // keeping its own name, or taking a name only used in another locale, is fine
        assert_eq!(service.update_zone(footer.id, rename("footer")).await.unwrap().name, "footer");
        assert_eq!(service.update_zone(footer.id, rename("banner")).await.unwrap().name, "banner");
    }

    #[tokio::test]
    async fn inverted_window_is_rejected() {
        let service = AdService::new(Arc::new(MemoryBackend::new()));
        let zone = service
            .create_zone(Locale::En, serde_json::from_value(json!({ "name": "banner" })).unwrap())
            .await
            .unwrap();
        let now = Utc::now();
        let input: CreateAdInput = serde_json::from_value(json!({
            "title": "Bad",
            "image_url": "https://cdn.test/bad.jpg",
            "start_date": now,
            "end_date": now - Duration::hours(1),
        }))
        .unwrap();
        assert_matches!(service.create_ad(zone.id, input).await, Err(ServiceError::InvalidInput(_)));
    }
}
