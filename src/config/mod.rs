pub mod registry;

#[cfg(feature = "cli")]
use crate::core::coordinates::CoordinateResolver;
#[cfg(feature = "cli")]
use crate::domain::model::Point;
#[cfg(feature = "cli")]
use crate::utils::error::{Result, SiteGeoError};
#[cfg(feature = "cli")]
use crate::utils::validation::{self, Validate};
#[cfg(feature = "cli")]
use clap::Parser;

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "site-geo")]
#[command(about = "Resolve a point into a consolidated site report from several geodata sources")]
pub struct CliConfig {
    /// Path to a TOML source registry (built-in registry when omitted)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Free-form pasted coordinates, read as "lat, lon"
    #[arg(short, long, conflicts_with_all = ["lat", "lon"], allow_hyphen_values = true)]
    pub text: Option<String>,

    /// Latitude field ('.' or ',' decimal separator)
    #[arg(long, requires = "lon", allow_hyphen_values = true)]
    pub lat: Option<String>,

    /// Longitude field ('.' or ',' decimal separator)
    #[arg(long, requires = "lat", allow_hyphen_values = true)]
    pub lon: Option<String>,

    /// Swap latitude and longitude after reading them
    #[arg(long)]
    pub swap: bool,

    /// Override backend.base_url from the registry
    #[arg(long)]
    pub base_url: Option<String>,

    /// Directory where the report archive is written
    #[arg(long)]
    pub output_path: Option<String>,

    /// Write a zip archive of the report
    #[arg(long)]
    pub archive: bool,

    /// Only probe the backend /health route and exit
    #[arg(long)]
    pub check_health: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub log_json: bool,

    /// Log process resource usage around the run
    #[arg(long)]
    pub monitor: bool,
}

#[cfg(feature = "cli")]
impl CliConfig {
    /// 依參數取得查詢點：貼上文字或兩個欄位，再視需要交換
    pub fn resolve_point(&self, resolver: &CoordinateResolver) -> Result<Point> {
        let point = match (&self.text, &self.lat, &self.lon) {
            (Some(text), _, _) => resolver.parse(text)?,
            (None, Some(lat), Some(lon)) => resolver.submit_fields(lat, lon)?,
            _ => {
                return Err(SiteGeoError::MissingConfigError {
                    field: "--text or --lat/--lon".to_string(),
                })
            }
        };

        Ok(if self.swap {
            resolver.swap(point)
        } else {
            point
        })
    }
}

#[cfg(feature = "cli")]
impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        if let Some(base_url) = &self.base_url {
            validation::validate_url("--base-url", base_url)?;
        }
        if let Some(path) = &self.output_path {
            validation::validate_path("--output-path", path)?;
        }
        if !self.check_health && self.text.is_none() && self.lat.is_none() {
            return Err(SiteGeoError::MissingConfigError {
                field: "--text or --lat/--lon".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(all(test, feature = "cli"))]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_point_from_text_with_swap() {
        let config =
            CliConfig::parse_from(["site-geo", "--text", "3.2202, 43.3204", "--swap"]);
        let point = config.resolve_point(&CoordinateResolver::new()).unwrap();
        assert_eq!(point.lat(), 43.3204);
        assert_eq!(point.lon(), 3.2202);
    }

    #[test]
    fn test_text_starting_with_negative_latitude() {
        let config = CliConfig::try_parse_from(["site-geo", "--text", "-33.8688, 151.2093"])
            .expect("negative pasted text should reach the resolver");
        assert_eq!(config.text.as_deref(), Some("-33.8688, 151.2093"));

        let point = config.resolve_point(&CoordinateResolver::new()).unwrap();
        assert_eq!(point.lat(), -33.8688);
        assert_eq!(point.lon(), 151.2093);
    }

    #[test]
    fn test_resolve_point_from_fields() {
        let config = CliConfig::parse_from(["site-geo", "--lat", "43,5", "--lon", "-0,25"]);
        assert!(config.validate().is_ok());
        let point = config.resolve_point(&CoordinateResolver::new()).unwrap();
        assert_eq!(point.lat(), 43.5);
        assert_eq!(point.lon(), -0.25);
    }

    #[test]
    fn test_missing_point_is_rejected() {
        let config = CliConfig::parse_from(["site-geo"]);
        assert!(config.validate().is_err());

        let health_only = CliConfig::parse_from(["site-geo", "--check-health"]);
        assert!(health_only.validate().is_ok());
    }

    #[test]
    fn test_bad_field_is_validation_error() {
        let config = CliConfig::parse_from(["site-geo", "--lat", "abc", "--lon", "3"]);
        let err = config.resolve_point(&CoordinateResolver::new()).unwrap_err();
        assert!(matches!(err, SiteGeoError::ValidationError(_)));
    }
}
