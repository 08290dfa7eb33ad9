use actix_web::web;
use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::IntoParams;

use crate::model::attendance::AttendanceFilter;
use crate::utils::date::optional_calendar_day;
use error::ApiError;

#[cfg(test)]
macro_rules! test_app {
    ($store:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data($crate::api::test_support::store_data($store))
                .configure(|cfg| {
                    $crate::routes::configure(cfg, &$crate::api::test_support::test_config())
                }),
        )
        .await
    };
}

pub mod attendance;
pub mod classes;
pub mod error;
pub mod statistics;
pub mod students;

/// Inclusive day range shared by the log and statistics endpoints.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct DateRangeQuery {
    /// First day, inclusive (YYYY-MM-DD)
    #[serde(default, deserialize_with = "optional_calendar_day")]
    #[param(value_type = Option<String>, example = "2024-01-01")]
    pub start_date: Option<NaiveDate>,
    /// Last day, inclusive (YYYY-MM-DD)
    #[serde(default, deserialize_with = "optional_calendar_day")]
    #[param(value_type = Option<String>, example = "2024-03-31")]
    pub end_date: Option<NaiveDate>,
}

impl DateRangeQuery {
    pub fn to_filter(&self) -> AttendanceFilter {
        AttendanceFilter::range(self.start_date, self.end_date)
    }
}

// Extractor failures (bad JSON, non-numeric ids, malformed dates) all come
// back as `{"error": ...}` with 400.

pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .error_handler(|err, _req| ApiError::BadRequest(err.to_string()).into())
}

pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default()
        .error_handler(|err, _req| ApiError::BadRequest(err.to_string()).into())
}

pub fn path_config() -> web::PathConfig {
    web::PathConfig::default()
        .error_handler(|err, _req| ApiError::BadRequest(err.to_string()).into())
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use actix_web::web;

    use crate::config::Config;
    use crate::store::{InMemoryStore, Store};

    pub fn test_config() -> Config {
        Config::from_lookup(|key| match key {
            "RATE_LIMIT_PER_MIN" => Some("0".to_string()),
            _ => None,
        })
        .expect("test config")
    }

    pub fn store_data(store: Arc<InMemoryStore>) -> web::Data<dyn Store> {
        let store: Arc<dyn Store> = store;
        web::Data::from(store)
    }
}
