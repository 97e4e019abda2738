//! Health advice keyed by AQI band and audience.

/// AQI bands with closed upper bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AqiBand {
    Excellent,
    Moderate,
    UnhealthyForSensitiveGroups,
    Unhealthy,
    VeryUnhealthy,
    Hazardous,
}

impl AqiBand {
    pub fn from_aqi(aqi: i64) -> Self {
        match aqi {
            i64::MIN..=50 => AqiBand::Excellent,
            51..=100 => AqiBand::Moderate,
            101..=150 => AqiBand::UnhealthyForSensitiveGroups,
            151..=200 => AqiBand::Unhealthy,
            201..=300 => AqiBand::VeryUnhealthy,
            _ => AqiBand::Hazardous,
        }
    }

    pub fn base_tip(&self) -> &'static str {
        match self {
            AqiBand::Excellent => "Excellent air quality! Perfect for outdoor activities.",
            AqiBand::Moderate => "Moderate air quality. Generally acceptable for most people.",
            AqiBand::UnhealthyForSensitiveGroups => {
                "Unhealthy for sensitive groups. Reduce prolonged outdoor exertion."
            }
            AqiBand::Unhealthy => "Unhealthy air quality. Everyone may experience health effects.",
            AqiBand::VeryUnhealthy => {
                "Very unhealthy. Health alert: everyone may experience more serious health effects."
            }
            AqiBand::Hazardous => "Hazardous conditions. Health warnings of emergency conditions.",
        }
    }
}

/// Audiences that get an extra clause once air quality drops below excellent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Asthmatic,
    Elderly,
    Child,
    Pregnant,
    Athlete,
}

impl Category {
    /// Exact, case-sensitive match. `general` and anything else is `None`.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "asthmatic" => Some(Category::Asthmatic),
            "elderly" => Some(Category::Elderly),
            "child" => Some(Category::Child),
            "pregnant" => Some(Category::Pregnant),
            "athlete" => Some(Category::Athlete),
            _ => None,
        }
    }

    pub fn clause(&self) -> &'static str {
        match self {
            Category::Asthmatic => "Stay inside, use inhaler as needed.",
            Category::Elderly => "Short walks only, avoid strenuous activities.",
            Category::Child => "Keep children indoors as much as possible.",
            Category::Pregnant => {
                "Limit outdoor exposure and consider an N95 mask in high-traffic areas."
            }
            Category::Athlete => "Move intense training indoors or to early morning hours.",
        }
    }
}

pub fn select_tip(aqi: i64, category: &str) -> String {
    let base = AqiBand::from_aqi(aqi).base_tip();

    match Category::parse(category) {
        Some(cat) if aqi > 50 => format!("{base} {}", cat.clause()),
        _ => base.to_string(),
    }
}
