use serde::{Deserialize, Serialize};

use crate::session::OverlayAction;

/// Digit keys 1..=9 are the only direct slot addresses, which bounds the page size.
pub const MAX_SLOT_KEYS: usize = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    #[default]
    List,
    Grid,
}

impl Variant {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::List => "list",
            Self::Grid => "grid",
        }
    }
}

impl std::str::FromStr for Variant {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "list" => Ok(Self::List),
            "grid" | "wheel" => Ok(Self::Grid),
            other => Err(format!("unknown overlay variant '{other}'")),
        }
    }
}

/// Maps a DOM-style `key` / `code` pair to an overlay action. Unbound keys
/// resolve to `None` and must be left to the host (typing into the input).
/// `slots` is the number of grid slots on a page; digits beyond it are unbound.
pub fn resolve(
    variant: Variant,
    key: &str,
    code: Option<&str>,
    slots: usize,
) -> Option<OverlayAction> {
    match variant {
        Variant::List => resolve_list(key),
        Variant::Grid => resolve_grid(key, code, slots.min(MAX_SLOT_KEYS)),
    }
}

fn resolve_list(key: &str) -> Option<OverlayAction> {
    match key {
        "ArrowDown" => Some(OverlayAction::Next),
        "ArrowUp" => Some(OverlayAction::Prev),
        "Enter" => Some(OverlayAction::Confirm),
        "Escape" => Some(OverlayAction::Cancel),
        _ => None,
    }
}

fn resolve_grid(key: &str, code: Option<&str>, slots: usize) -> Option<OverlayAction> {
    let slot = digit_slot(key, slots).or_else(|| code.and_then(|code| numpad_slot(code, slots)));
    if let Some(slot) = slot {
        return Some(OverlayAction::SelectSlot(slot));
    }
    match key {
        "PageUp" | "ArrowLeft" => Some(OverlayAction::PrevPage),
        "PageDown" | "ArrowRight" => Some(OverlayAction::NextPage),
        "Enter" => Some(OverlayAction::Confirm),
        "Escape" => Some(OverlayAction::Cancel),
        _ => None,
    }
}

// Key "n" addresses slot n - 1.
fn digit_slot(key: &str, slots: usize) -> Option<usize> {
    let mut chars = key.chars();
    let digit = chars.next()?.to_digit(10)? as usize;
    if chars.next().is_some() || !(1..=slots).contains(&digit) {
        return None;
    }
    Some(digit - 1)
}

fn numpad_slot(code: &str, slots: usize) -> Option<usize> {
    digit_slot(code.strip_prefix("Numpad")?, slots)
}

#[cfg(test)]
mod tests {
    use super::{resolve, Variant, MAX_SLOT_KEYS};
    use crate::session::OverlayAction;

    #[test]
    fn list_arrows_move_focus() {
        assert_eq!(resolve(Variant::List, "ArrowDown", None, 0), Some(OverlayAction::Next));
        assert_eq!(resolve(Variant::List, "ArrowUp", None, 0), Some(OverlayAction::Prev));
        assert_eq!(resolve(Variant::List, "a", None, 0), None);
    }

    #[test]
    fn grid_digits_and_numpad_select_slots() {
        assert_eq!(resolve(Variant::Grid, "1", None, 6), Some(OverlayAction::SelectSlot(0)));
        assert_eq!(resolve(Variant::Grid, "6", None, 6), Some(OverlayAction::SelectSlot(5)));
        assert_eq!(
            resolve(Variant::Grid, "End", Some("Numpad3"), 6),
            Some(OverlayAction::SelectSlot(2))
        );
        assert_eq!(resolve(Variant::Grid, "7", None, 6), None);
        assert_eq!(resolve(Variant::Grid, "0", Some("Numpad0"), 6), None);
    }

    #[test]
    fn every_slot_of_the_largest_page_has_a_digit() {
        for n in 1..=MAX_SLOT_KEYS {
            let key = n.to_string();
            assert_eq!(
                resolve(Variant::Grid, &key, None, MAX_SLOT_KEYS),
                Some(OverlayAction::SelectSlot(n - 1))
            );
            assert_eq!(
                resolve(Variant::Grid, "x", Some(&format!("Numpad{n}")), MAX_SLOT_KEYS),
                Some(OverlayAction::SelectSlot(n - 1))
            );
        }
        assert_eq!(resolve(Variant::Grid, "9", None, 12), Some(OverlayAction::SelectSlot(8)));
        assert_eq!(resolve(Variant::Grid, "4", None, 3), None);
    }

    #[test]
    fn grid_paging_keys() {
        assert_eq!(resolve(Variant::Grid, "PageUp", None, 6), Some(OverlayAction::PrevPage));
        assert_eq!(resolve(Variant::Grid, "ArrowRight", None, 6), Some(OverlayAction::NextPage));
        assert_eq!(resolve(Variant::Grid, "ArrowDown", None, 6), None);
    }

    #[test]
    fn variant_parses_wheel_alias() {
        assert_eq!("wheel".parse::<Variant>(), Ok(Variant::Grid));
        assert!("tree".parse::<Variant>().is_err());
    }
}
