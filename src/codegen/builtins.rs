//! Builtin/API surface.
//!
//! Two static tables route syntax to the hand-written runtime archive:
//!
//! * `api_method` — methods on the runtime carrier types (String, Number,
//!   Array, RegExp, Date, MomentJS). A recognized call lowers to a call
//!   against a mangled external symbol whose first argument is the
//!   receiver.
//! * `ingredient_type` — zero-argument external accessors for the fixed
//!   "rule ingredient" vocabulary, matched by the dotted access path
//!   joined with `_`. All of them currently return a string.
//!
//! Changing any name or signature here is a breaking change against the
//! runtime's compiled layout.

use crate::types::ScriptType;

/// Parameter/return vocabulary of the API table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiKind {
    Double,
    Boolean,
    Str,
    StrArray,
}

impl ApiKind {
    pub fn script_type(&self) -> ScriptType {
        match self {
            ApiKind::Double => ScriptType::Number,
            ApiKind::Boolean => ScriptType::Boolean,
            ApiKind::Str => ScriptType::String,
            ApiKind::StrArray => ScriptType::Array(Box::new(ScriptType::String)),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ApiMethod {
    pub params: &'static [ApiKind],
    pub ret: ApiKind,
}

const fn m(params: &'static [ApiKind], ret: ApiKind) -> ApiMethod {
    ApiMethod { params, ret }
}

/// Look up a builtin method on a runtime carrier type.
pub fn api_method(class_name: &str, method_name: &str) -> Option<ApiMethod> {
    use ApiKind::*;
    let method = match (class_name, method_name) {
        ("String", "concat") => m(&[Str], Str),
        ("String", "replace") => m(&[Str, Str], Str),
        ("String", "indexOf") => m(&[Str], Double),
        ("String", "lastIndexOf") => m(&[Str], Double),
        ("String", "trim") => m(&[], Str),
        ("String", "charAt") => m(&[Double], Str),
        ("String", "slice") => m(&[Double, Double], Str),
        ("String", "substring") => m(&[Double, Double], Str),
        ("String", "split") => m(&[Str], StrArray),
        ("String", "toUpperCase") => m(&[], Str),
        ("String", "toLowerCase") => m(&[], Str),
        ("String", "match") => m(&[Str], Str),
        ("Number", "toString") => m(&[], Str),
        ("Number", "toFixed") => m(&[Double], Str),
        ("Array", "toString") => m(&[], Str),
        ("Array", "join") => m(&[Str], Str),
        ("RegExp", "exec") => m(&[Str], Str),
        ("RegExp", "test") => m(&[Str], Boolean),
        ("Date", "format") => m(&[Str], Str),
        ("MomentJS", "toString") => m(&[], Str),
        ("MomentJS", "add") => m(&[Double, Str], Double),
        ("MomentJS", "day") => m(&[], Double),
        ("MomentJS", "hour") => m(&[], Double),
        _ => return None,
    };
    Some(method)
}

pub fn is_api_function(class_name: &str, method_name: &str) -> bool {
    api_method(class_name, method_name).is_some()
}

/// Fixed vocabulary of external data-source accessors. The accessor
/// symbol IS the joined dotted path; each is a zero-argument external
/// function.
const INGREDIENT_NAMES: &[&str] = &[
    "Weather_tomorrowsForecastCallsFor_ConditionImageURL",
    "AndroidPhone_placeAPhoneCall_CallLength",
    "AndroidPhone_placeAPhoneCall_OccurredAt",
    "Feed_newFeedItem_EntryTitle",
    "Trigger_EntryTitle",
    "Trigger_Text",
    "Trigger_LinkToProfile",
    "SpotifyTrackPlayListAdded_AddedBy",
    "SpotifyTrackPlayListAdded_TrackName",
    "SpotifyTrackPlayListAdded_TrackURL",
    "SpotifyTrackPlayListAdded_ArtistName",
    "SpotifyTrackPlayListAdded_AlbumName",
    "SpotifyTrackPlayListAdded_PlaylistName",
    "GoogleDrive_anyNewPhoto_PhotoUrl",
    "GoogleDrive_anyNewPhoto_Filename",
    "Reddit_newHotPostInSubreddit_Title",
    "GoogleCalendar_anyEventEnds_Title",
    "Youtube_newPublicVideoFromSubscriptions_Title",
    "Twitter_newTweetByUser_CreatedAt",
    "Twitter_newTweetByUser_Text",
    "Netro_sensorData_Moisture",
];

/// Return type of an ingredient accessor, if `candidate` names one.
pub fn ingredient_type(candidate: &str) -> Option<ApiKind> {
    if INGREDIENT_NAMES.contains(&candidate) {
        Some(ApiKind::Str)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_methods_are_recognized() {
        assert!(is_api_function("String", "toUpperCase"));
        assert!(is_api_function("String", "match"));
        assert!(!is_api_function("String", "reverse"));
    }

    #[test]
    fn regexp_test_returns_boolean() {
        let method = api_method("RegExp", "test").unwrap();
        assert_eq!(method.ret, ApiKind::Boolean);
        assert_eq!(method.params, &[ApiKind::Str]);
    }

    #[test]
    fn split_returns_string_array() {
        let method = api_method("String", "split").unwrap();
        assert_eq!(
            method.ret.script_type(),
            crate::types::ScriptType::Array(Box::new(crate::types::ScriptType::String))
        );
    }

    #[test]
    fn ingredients_match_on_joined_path() {
        assert_eq!(ingredient_type("Trigger_Text"), Some(ApiKind::Str));
        assert_eq!(
            ingredient_type("Weather_tomorrowsForecastCallsFor_ConditionImageURL"),
            Some(ApiKind::Str)
        );
        assert_eq!(ingredient_type("Trigger.Text"), None);
        assert_eq!(ingredient_type("NotAnIngredient"), None);
    }
}
