//! Style properties
//!
//! A [`Stylesheet`] is a flat list of rules keyed by widget type name, an
//! optional draw state and a property name. When an element attaches, the
//! rules for its type are copied into the element's [`ResolvedStyle`];
//! queries then read the element (and optionally its ancestors) without going
//! back to the stylesheet.
//!
//! Values can be given as CSS-like strings: `#rrggbb` and a handful of named
//! colors, and lengths in `px`, `em` or `rem`.

use crate::element::{DrawState, ElementId};
use crate::window::Window;

// =============================================================================
// Values
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const BLACK: Color = Color {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 1.0,
    };
    pub const WHITE: Color = Color {
        r: 1.0,
        g: 1.0,
        b: 1.0,
        a: 1.0,
    };
    pub const TRANSPARENT: Color = Color {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 0.0,
    };

    /// Opaque color from a `0xRRGGBB` literal.
    pub fn rgb(hex: u32) -> Self {
        Color {
            r: ((hex >> 16) & 0xFF) as f32 / 255.0,
            g: ((hex >> 8) & 0xFF) as f32 / 255.0,
            b: (hex & 0xFF) as f32 / 255.0,
            a: 1.0,
        }
    }

    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::BLACK
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    Color,
    Length,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StyleProperty {
    Color(Color),
    Length(f32),
}

impl StyleProperty {
    pub fn kind(&self) -> PropertyKind {
        match self {
            StyleProperty::Color(_) => PropertyKind::Color,
            StyleProperty::Length(_) => PropertyKind::Length,
        }
    }

    pub fn as_color(&self) -> Option<Color> {
        match self {
            StyleProperty::Color(c) => Some(*c),
            _ => None,
        }
    }

    pub fn as_length(&self) -> Option<f32> {
        match self {
            StyleProperty::Length(l) => Some(*l),
            _ => None,
        }
    }

    /// Parse a CSS-like value: a color if it reads as one, else a length.
    pub fn parse(value: &str) -> Option<StyleProperty> {
        parse_color(value)
            .map(StyleProperty::Color)
            .or_else(|| parse_length(value).map(StyleProperty::Length))
    }
}

pub fn parse_length(value: &str) -> Option<f32> {
    let value = value.trim();
    if value.ends_with("px") {
        value.trim_end_matches("px").parse().ok()
    } else if value.ends_with("rem") {
        value.trim_end_matches("rem").parse::<f32>().ok().map(|v| v * 16.0)
    } else if value.ends_with("em") {
        value.trim_end_matches("em").parse::<f32>().ok().map(|v| v * 16.0)
    } else {
        value.parse().ok()
    }
}

pub fn parse_color(value: &str) -> Option<Color> {
    let value = value.trim();

    if let Some(hex) = value.strip_prefix('#') {
        if hex.len() == 6 {
            let r = u8::from_str_radix(hex.get(0..2)?, 16).ok()? as f32 / 255.0;
            let g = u8::from_str_radix(hex.get(2..4)?, 16).ok()? as f32 / 255.0;
            let b = u8::from_str_radix(hex.get(4..6)?, 16).ok()? as f32 / 255.0;
            return Some(Color { r, g, b, a: 1.0 });
        }
        return None;
    }

    match value {
        "transparent" => Some(Color::TRANSPARENT),
        "white" => Some(Color::WHITE),
        "black" => Some(Color::BLACK),
        "red" => Some(Color::rgb(0xFF0000)),
        "green" => Some(Color::rgb(0x008000)),
        "blue" => Some(Color::rgb(0x0000FF)),
        _ => None,
    }
}

// =============================================================================
// Stylesheet
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct StyleRule {
    pub type_name: String,
    /// `None` applies in every state unless a state-specific rule exists.
    pub state: Option<DrawState>,
    pub property: String,
    pub value: StyleProperty,
}

#[derive(Debug, Clone)]
pub struct Stylesheet {
    rules: Vec<StyleRule>,
}

impl Default for Stylesheet {
    fn default() -> Self {
        let mut sheet = Stylesheet::empty();
        sheet.set("trellis.window", None, "background-color", StyleProperty::Color(Color::rgb(0x202020)));
        sheet.set("trellis.widgets.label", None, "color", StyleProperty::Color(Color::WHITE));
        sheet.set(
            "trellis.widgets.button",
            Some(DrawState::Normal),
            "background-color",
            StyleProperty::Color(Color::rgb(0x404F3C)),
        );
        sheet.set(
            "trellis.widgets.button",
            Some(DrawState::Hover),
            "background-color",
            StyleProperty::Color(Color::rgb(0x5C704C)),
        );
        sheet.set(
            "trellis.widgets.button",
            Some(DrawState::Focus),
            "background-color",
            StyleProperty::Color(Color::rgb(0x364232)),
        );
        sheet.set("trellis.widgets.button", None, "padding", StyleProperty::Length(5.0));
        sheet
    }
}

impl Stylesheet {
    /// A stylesheet with no rules at all.
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Add or replace the rule for `(type_name, state, property)`.
    pub fn set(&mut self, type_name: &str, state: Option<DrawState>, property: &str, value: StyleProperty) {
        match self
            .rules
            .iter_mut()
            .find(|r| r.type_name == type_name && r.state == state && r.property == property)
        {
            Some(rule) => rule.value = value,
            None => self.rules.push(StyleRule {
                type_name: type_name.to_string(),
                state,
                property: property.to_string(),
                value,
            }),
        }
    }

    /// Like [`set`](Self::set) with a CSS-like value. Returns `false` (and
    /// changes nothing) if the value does not parse.
    pub fn set_str(&mut self, type_name: &str, state: Option<DrawState>, property: &str, value: &str) -> bool {
        match StyleProperty::parse(value) {
            Some(parsed) => {
                self.set(type_name, state, property, parsed);
                true
            }
            None => {
                log::warn!("stylesheet: cannot parse `{}` for {}/{}", value, type_name, property);
                false
            }
        }
    }

    pub fn rules_for<'a>(&'a self, type_name: &'a str) -> impl Iterator<Item = &'a StyleRule> + 'a {
        self.rules.iter().filter(move |r| r.type_name == type_name)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

// =============================================================================
// Resolution & Queries
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
struct ResolvedEntry {
    state: Option<DrawState>,
    property: String,
    value: StyleProperty,
}

/// Style rules captured on an element when it was attached.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedStyle {
    entries: Vec<ResolvedEntry>,
}

impl ResolvedStyle {
    /// Exact match on state and property name.
    fn get(&self, state: Option<DrawState>, property: &str) -> Option<StyleProperty> {
        self.entries
            .iter()
            .find(|e| e.state == state && e.property == property)
            .map(|e| e.value)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Copy the stylesheet rules for the element's type onto the element.
pub fn resolve(window: &mut Window, id: ElementId) {
    let Some(type_name) = window
        .element(id)
        .and_then(|e| e.type_ref())
        .and_then(|t| window.types.name(t))
    else {
        log::debug!("style::resolve: {:?} has no type yet", id);
        return;
    };

    let entries: Vec<ResolvedEntry> = window
        .stylesheet
        .rules_for(type_name)
        .map(|r| ResolvedEntry {
            state: r.state,
            property: r.property.clone(),
            value: r.value,
        })
        .collect();

    if let Some(elem) = window.element_mut(id) {
        elem.style = ResolvedStyle { entries };
    }
}

/// Look up a stateless property. With `inherit`, ancestors are consulted
/// until one defines it.
pub fn query_property(
    window: &Window,
    id: ElementId,
    property: &str,
    kind: PropertyKind,
    inherit: bool,
) -> Option<StyleProperty> {
    query(window, id, None, property, kind, inherit)
}

/// Look up a property for a draw state, falling back to the stateless rule
/// on each element before moving to its parent.
pub fn query_state_property(
    window: &Window,
    id: ElementId,
    state: DrawState,
    property: &str,
    kind: PropertyKind,
    inherit: bool,
) -> Option<StyleProperty> {
    query(window, id, Some(state), property, kind, inherit)
}

fn query(
    window: &Window,
    id: ElementId,
    state: Option<DrawState>,
    property: &str,
    kind: PropertyKind,
    inherit: bool,
) -> Option<StyleProperty> {
    let mut current = Some(id);
    while let Some(cur) = current {
        let elem = window.element(cur)?;
        let found = state
            .and_then(|s| elem.style.get(Some(s), property))
            .or_else(|| elem.style.get(None, property));

        if let Some(value) = found {
            if value.kind() != kind {
                log::warn!("style: `{}` on {:?} is {:?}, wanted {:?}", property, cur, value.kind(), kind);
                return None;
            }
            return Some(value);
        }

        if !inherit {
            return None;
        }
        current = elem.parent();
    }
    None
}

impl Window {
    pub fn stylesheet(&self) -> &Stylesheet {
        &self.stylesheet
    }

    /// Edit the stylesheet. Call [`restyle`](Self::restyle) afterwards to
    /// apply changes to elements that are already attached.
    pub fn stylesheet_mut(&mut self) -> &mut Stylesheet {
        &mut self.stylesheet
    }

    /// Re-resolve every attached element against the current stylesheet.
    pub fn restyle(&mut self) {
        let root = self.root;
        for id in self.subtree(root) {
            if self.element(id).map_or(false, |e| e.is_attached()) {
                resolve(self, id);
            }
        }
        self.mark_dirty(root);
    }

    pub fn query_color(&self, id: ElementId, state: DrawState, property: &str, inherit: bool) -> Option<Color> {
        query_state_property(self, id, state, property, PropertyKind::Color, inherit).and_then(|p| p.as_color())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{AddPosition, Behaviors};
    use crate::testing::headless_window;

    // =========================================================================
    // Parsing
    // =========================================================================

    #[test]
    fn test_parse_hex_color() {
        let c = parse_color("#404F3C").expect("color");
        assert_eq!(c, Color::rgb(0x404F3C));
        assert!(parse_color("#12345").is_none());
        assert!(parse_color("#zzzzzz").is_none());
    }

    #[test]
    fn test_parse_non_ascii_hex_is_rejected() {
        // Six bytes, but not six hex digits.
        assert!(parse_color("#aé€").is_none());
        assert!(StyleProperty::parse("#aé€").is_none());
        let mut sheet = Stylesheet::empty();
        assert!(!sheet.set_str("t", None, "color", "#é€b"));
        assert!(sheet.is_empty());
    }

    #[test]
    fn test_parse_named_color() {
        assert_eq!(parse_color(" white "), Some(Color::WHITE));
        assert_eq!(parse_color("transparent").map(|c| c.a), Some(0.0));
        assert!(parse_color("mauve").is_none());
    }

    #[test]
    fn test_parse_length_units() {
        assert_eq!(parse_length("12px"), Some(12.0));
        assert_eq!(parse_length("2em"), Some(32.0));
        assert_eq!(parse_length("1.5rem"), Some(24.0));
        assert_eq!(parse_length("7"), Some(7.0));
        assert_eq!(parse_length("wide"), None);
    }

    #[test]
    fn test_property_parse_prefers_color() {
        assert_eq!(StyleProperty::parse("black"), Some(StyleProperty::Color(Color::BLACK)));
        assert_eq!(StyleProperty::parse("4px"), Some(StyleProperty::Length(4.0)));
        assert_eq!(StyleProperty::parse("nope"), None);
    }

    // =========================================================================
    // Stylesheet
    // =========================================================================

    #[test]
    fn test_set_replaces_matching_rule() {
        let mut sheet = Stylesheet::empty();
        sheet.set("t", None, "color", StyleProperty::Color(Color::BLACK));
        sheet.set("t", None, "color", StyleProperty::Color(Color::WHITE));
        sheet.set("t", Some(DrawState::Hover), "color", StyleProperty::Color(Color::BLACK));
        assert_eq!(sheet.len(), 2);
        assert!(!sheet.set_str("t", None, "color", "not-a-color"));
        assert_eq!(sheet.len(), 2);
    }

    // =========================================================================
    // Queries
    // =========================================================================

    #[test]
    fn test_window_background_resolves_from_defaults() {
        let window = headless_window();
        let root = window.root();
        let bg = query_property(&window, root, "background-color", PropertyKind::Color, true);
        assert_eq!(bg, Some(StyleProperty::Color(Color::rgb(0x202020))));
    }

    #[test]
    fn test_inherit_walks_to_ancestor() {
        let mut window = headless_window();
        let root = window.root();
        let child = window.create_element(Behaviors::BASE);
        window.add_child(root, child, AddPosition::Tail);

        let direct = query_property(&window, child, "background-color", PropertyKind::Color, false);
        let inherited = query_property(&window, child, "background-color", PropertyKind::Color, true);
        assert_eq!(direct, None);
        assert_eq!(inherited, Some(StyleProperty::Color(Color::rgb(0x202020))));
    }

    #[test]
    fn test_kind_mismatch_yields_none() {
        let window = headless_window();
        let root = window.root();
        let bg = query_property(&window, root, "background-color", PropertyKind::Length, true);
        assert_eq!(bg, None);
    }

    #[test]
    fn test_state_rule_falls_back_to_stateless() {
        let mut window = headless_window();
        window
            .stylesheet_mut()
            .set("trellis.element", None, "color", StyleProperty::Color(Color::WHITE));
        window.stylesheet_mut().set(
            "trellis.element",
            Some(DrawState::Hover),
            "color",
            StyleProperty::Color(Color::BLACK),
        );
        let root = window.root();
        let id = window.create_element(Behaviors::BASE);
        window.add_child(root, id, AddPosition::Tail);

        assert_eq!(window.query_color(id, DrawState::Hover, "color", false), Some(Color::BLACK));
        assert_eq!(window.query_color(id, DrawState::Focus, "color", false), Some(Color::WHITE));
    }

    #[test]
    fn test_restyle_applies_to_attached_elements() {
        let mut window = headless_window();
        let root = window.root();
        assert!(window.stylesheet_mut().set_str("trellis.window", None, "background-color", "#102030"));
        assert_eq!(
            window.query_color(root, DrawState::Normal, "background-color", false),
            Some(Color::rgb(0x202020))
        );
        window.restyle();
        assert_eq!(
            window.query_color(root, DrawState::Normal, "background-color", false),
            Some(Color::rgb(0x102030))
        );
    }
}
