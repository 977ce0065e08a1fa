use crate::domain::model::Point;
use crate::utils::error::{ParseError, ParseFailure, ValidationError};
use regex::Regex;
use std::sync::OnceLock;

pub type ParseOutcome = std::result::Result<Point, ParseError>;

fn number_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // 小數點可為 '.' 或 ','（法式寫法）
    PATTERN.get_or_init(|| Regex::new(r"[-+]?\d+(?:[.,]\d+)?").expect("valid number pattern"))
}

fn to_number(token: &str) -> Option<f64> {
    token
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

/// 座標輸入：一律先緯度後經度，不依數值大小猜測順序，順序相反時以 swap 修正
#[derive(Debug, Clone, Copy, Default)]
pub struct CoordinateResolver;

impl CoordinateResolver {
    pub fn new() -> Self {
        Self
    }

    /// 從任意貼上的文字取出前兩個數字作為 (lat, lon)
    pub fn parse(&self, text: &str) -> ParseOutcome {
        let fail = |reason| ParseError {
            input: text.to_string(),
            reason,
        };

        if text.trim().is_empty() {
            return Err(fail(ParseFailure::Empty));
        }

        let tokens: Vec<&str> = number_pattern()
            .find_iter(text)
            .take(2)
            .map(|m| m.as_str())
            .collect();

        if tokens.len() < 2 {
            return Err(fail(ParseFailure::NotEnoughNumbers {
                found: tokens.len(),
            }));
        }

        let mut values = [0.0_f64; 2];
        for (slot, token) in values.iter_mut().zip(&tokens) {
            *slot = to_number(token).ok_or_else(|| {
                fail(ParseFailure::NotFinite {
                    token: token.to_string(),
                })
            })?;
        }

        let [lat, lon] = values;
        tracing::debug!("📍 Parsed coordinates lat={} lon={} from pasted text", lat, lon);
        Point::new(lat, lon).map_err(|e| {
            fail(ParseFailure::NotFinite { token: e.value })
        })
    }

    /// 輸入可能不存在（例如剪貼簿為空）
    pub fn parse_optional(&self, text: Option<&str>) -> ParseOutcome {
        match text {
            Some(text) => self.parse(text),
            None => Err(ParseError {
                input: String::new(),
                reason: ParseFailure::Empty,
            }),
        }
    }

    pub fn swap(&self, point: Point) -> Point {
        point.swapped()
    }

    /// 送出兩個欄位時的驗證，與貼上時相同接受 ',' 小數點
    pub fn submit_fields(
        &self,
        lat_text: &str,
        lon_text: &str,
    ) -> std::result::Result<Point, ValidationError> {
        let lat = parse_field("latitude", lat_text)?;
        let lon = parse_field("longitude", lon_text)?;
        Point::new(lat, lon)
    }
}

fn parse_field(field: &str, text: &str) -> std::result::Result<f64, ValidationError> {
    let normalized = text.trim().replace(',', ".");
    let invalid = |reason: &str| ValidationError {
        field: field.to_string(),
        value: text.to_string(),
        reason: reason.to_string(),
    };

    if normalized.is_empty() {
        return Err(invalid("value is required"));
    }

    let value = normalized
        .parse::<f64>()
        .map_err(|_| invalid("value is not a number"))?;

    if !value.is_finite() {
        return Err(invalid("value must be a finite number"));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> ParseOutcome {
        CoordinateResolver::new().parse(text)
    }

    #[test]
    fn test_parse_mapping_tool_copy() {
        let point = parse("43.32047104103794, 3.2202660369625726").unwrap();
        assert_eq!(point.lat(), 43.32047104103794);
        assert_eq!(point.lon(), 3.2202660369625726);
    }

    #[test]
    fn test_parse_separators_and_decimal_styles() {
        let cases = [
            "48.8566 2.3522",
            "48.8566;2.3522",
            "48.8566,2.3522",
            "48,8566 2,3522",
            "48,8566; 2,3522",
            "48,8566 ; 2,3522",
            "lat: 48.8566 / lon: 2.3522",
        ];
        for text in cases {
            let point = parse(text).unwrap_or_else(|e| panic!("{}: {}", text, e));
            assert_eq!(point.lat(), 48.8566, "{}", text);
            assert_eq!(point.lon(), 2.3522, "{}", text);
        }
    }

    #[test]
    fn test_parse_signed_and_integer_values() {
        let point = parse("-33.8688, 151").unwrap();
        assert_eq!(point.lat(), -33.8688);
        assert_eq!(point.lon(), 151.0);

        let point = parse("+45 -0,5").unwrap();
        assert_eq!(point.lat(), 45.0);
        assert_eq!(point.lon(), -0.5);
    }

    #[test]
    fn test_parse_takes_first_two_numbers_only() {
        let point = parse("43.3 3.2 12.0").unwrap();
        assert_eq!(point.lat(), 43.3);
        assert_eq!(point.lon(), 3.2);
    }

    #[test]
    fn test_parse_keeps_lat_lon_order_regardless_of_magnitude() {
        // a lon/lat paste stays lon/lat; swap is the fix
        let point = parse("3.22, 43.32").unwrap();
        assert_eq!(point.lat(), 3.22);
        assert_eq!(point.lon(), 43.32);
    }

    #[test]
    fn test_parse_failures() {
        assert_eq!(parse("").unwrap_err().reason, ParseFailure::Empty);
        assert_eq!(parse("   ").unwrap_err().reason, ParseFailure::Empty);
        assert_eq!(
            CoordinateResolver::new()
                .parse_optional(None)
                .unwrap_err()
                .reason,
            ParseFailure::Empty
        );

        let err = parse("only one 48.85").unwrap_err();
        assert_eq!(err.reason, ParseFailure::NotEnoughNumbers { found: 1 });
        assert_eq!(err.input, "only one 48.85");

        assert_eq!(
            parse("no numbers here").unwrap_err().reason,
            ParseFailure::NotEnoughNumbers { found: 0 }
        );
    }

    #[test]
    fn test_parse_rejects_overflowing_token() {
        let huge = "9".repeat(400);
        let err = parse(&format!("{} 2.0", huge)).unwrap_err();
        assert!(matches!(err.reason, ParseFailure::NotFinite { .. }));
    }

    #[test]
    fn test_parse_is_idempotent() {
        let text = "43,5; 3,25";
        assert_eq!(parse(text), parse(text));
    }

    #[test]
    fn test_swap_twice_returns_original() {
        let resolver = CoordinateResolver::new();
        let point = parse("43.5, 3.25").unwrap();
        let swapped = resolver.swap(point);
        assert_eq!(swapped.lat(), 3.25);
        assert_eq!(resolver.swap(swapped), point);
    }

    #[test]
    fn test_submit_fields_accepts_comma_decimals() {
        let resolver = CoordinateResolver::new();
        let point = resolver.submit_fields(" 43,5 ", "3.25").unwrap();
        assert_eq!(point.lat(), 43.5);
        assert_eq!(point.lon(), 3.25);
    }

    #[test]
    fn test_submit_fields_rejects_bad_values() {
        let resolver = CoordinateResolver::new();

        let err = resolver.submit_fields("", "3.25").unwrap_err();
        assert_eq!(err.field, "latitude");

        let err = resolver.submit_fields("43.5", "abc").unwrap_err();
        assert_eq!(err.field, "longitude");

        let err = resolver.submit_fields("inf", "3.25").unwrap_err();
        assert_eq!(err.reason, "value must be a finite number");

        assert!(resolver.submit_fields("NaN", "3.25").is_err());
        assert!(resolver.submit_fields("43,5,1", "3.25").is_err());
    }
}
