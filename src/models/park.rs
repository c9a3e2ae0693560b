use serde::Serialize;
use utoipa::ToSchema;

/// Presentation-facing view of a tracked park: configured identity plus the
/// user's favorite/selected state.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Park {
    pub id: String,
    pub name: String,
    /// Whether the park appears in the park picker
    pub is_visible: bool,
    pub is_favorited: bool,
    pub is_selected: bool,
    /// IANA timezone name, if configured
    pub timezone: Option<String>,
}
