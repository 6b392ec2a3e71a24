//! Class-name conventions consumed by the registry and the graph loader.
//!
//! - `Entrance_<Kind>_<N>` — an entrance node; the registry keys the
//!   prototype as `Entrance_<Kind>` and the loader turns `<N>` into the
//!   entrance id.
//! - `Get_<varName>` / `Set_<varName>` — variable accessors; the loader
//!   resolves them against the synthesized `GetVar_<type>` /
//!   `SetVar_<type>` prototypes using the graph's variable declarations.

/// Prefix shared by all entrance class names.
pub const ENTRANCE_PREFIX: &str = "Entrance_";

/// Prefix selecting the global variable table; everything else is local.
pub const GLOBAL_VAR_PREFIX: &str = "g_";

/// Well-known global variable holding a `Do` invocation's return array.
pub const RETURN_VARIABLE: &str = "g_Return";

const GET_PREFIX: &str = "Get_";
const SET_PREFIX: &str = "Set_";

const GET_VAR_STEM: &str = "GetVar";
const SET_VAR_STEM: &str = "SetVar";

/// Split `Entrance_<Kind>_<N>` into the prototype key `Entrance_<Kind>`
/// and the numeric entrance id. Returns `None` for any other shape,
/// including bare `Entrance_<Kind>` (schema-side aliasing is handled by
/// the registry, which accepts both).
pub fn split_entrance_name(class: &str) -> Option<(&str, i64)> {
    if !class.starts_with(ENTRANCE_PREFIX) {
        return None;
    }
    let (stem, id) = class.rsplit_once('_')?;
    // Reject `Entrance_<N>` — the kind segment is mandatory.
    if stem == "Entrance" {
        return None;
    }
    let id = id.parse::<i64>().ok()?;
    Some((stem, id))
}

/// The variable name behind a `Get_<varName>` class, if it is one.
pub fn get_accessor_var(class: &str) -> Option<&str> {
    class.strip_prefix(GET_PREFIX)
}

/// The variable name behind a `Set_<varName>` class, if it is one.
pub fn set_accessor_var(class: &str) -> Option<&str> {
    class.strip_prefix(SET_PREFIX)
}

/// Prototype name of the synthesized getter for a variable subtype
/// spelling (e.g. `GetVar_int`).
pub fn get_var_node_name(type_spelling: &str) -> String {
    format!("{GET_VAR_STEM}_{type_spelling}")
}

/// Prototype name of the synthesized setter for a variable subtype
/// spelling (e.g. `SetVar_array`).
pub fn set_var_node_name(type_spelling: &str) -> String {
    format!("{SET_VAR_STEM}_{type_spelling}")
}

/// Whether a variable name addresses the global table.
pub fn is_global_var(name: &str) -> bool {
    name.starts_with(GLOBAL_VAR_PREFIX)
}
