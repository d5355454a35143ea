//! Card templates: form state + typeface -> laid-out [`CardElement`].
//!
//! Coordinates are logical pixels; the rasterizer applies the export scale.
//! Empty fields show their placeholder text, sized at the field's base size.

use crate::autofit::{fit, FitParams, TextMeasure};
use crate::form::{ordinal, CardForm, CardKind, Field, ImageSlot};
use crate::rendering::layout::{
    wrap_lines, Align, CardElement, ImageShape, LayoutNode, Rect, Rgba,
};

pub const BIRTHDAY_NAME: FitParams = FitParams { base_px: 22, min_px: 16, max_width_px: 180.0 };
pub const ANNIVERSARY_NAME: FitParams = FitParams { base_px: 24, min_px: 20, max_width_px: 600.0 };
pub const ANNIVERSARY_DESIGNATION: FitParams = FitParams { base_px: 20, min_px: 16, max_width_px: 500.0 };
pub const ONBOARDING_NAME: FitParams = FitParams { base_px: 28, min_px: 18, max_width_px: 360.0 };
pub const ONBOARDING_DESIGNATION: FitParams = FitParams { base_px: 18, min_px: 14, max_width_px: 360.0 };

const WHITE: Rgba = [255, 255, 255, 255];
const GOLD: Rgba = [255, 215, 0, 255];
const TEAL: Rgba = [47, 113, 100, 255];
const INK: Rgba = [31, 41, 55, 255];
const MUTED: Rgba = [75, 85, 99, 255];
const PHOTO_EMPTY: Rgba = [229, 231, 235, 255];

/// Autofit parameters for a field on a card, if the field is autofit at all.
pub fn fit_params(kind: CardKind, field: Field) -> Option<FitParams> {
    match (kind, field) {
        (CardKind::Birthday, Field::Name) => Some(BIRTHDAY_NAME),
        (CardKind::Anniversary, Field::Name) => Some(ANNIVERSARY_NAME),
        (CardKind::Anniversary, Field::Designation) => Some(ANNIVERSARY_DESIGNATION),
        (CardKind::Onboarding, Field::Name) => Some(ONBOARDING_NAME),
        (CardKind::Onboarding, Field::Designation) => Some(ONBOARDING_DESIGNATION),
        _ => None,
    }
}

/// Autofit size of `field` for the current form value.
pub fn field_size(form: &CardForm, field: Field, measure: &dyn TextMeasure) -> Option<u32> {
    fit_params(form.kind(), field).map(|p| fit(form.get(field), p, measure))
}

/// Lay out the card for `form`.
pub fn layout_card(form: &CardForm, measure: &dyn TextMeasure) -> CardElement {
    match form.kind() {
        CardKind::Birthday => birthday(form, measure),
        CardKind::Anniversary => anniversary(form, measure),
        CardKind::Onboarding => onboarding(form, measure),
    }
}

fn or_placeholder<'a>(value: &'a str, placeholder: &'a str) -> &'a str {
    if value.is_empty() {
        placeholder
    } else {
        value
    }
}

fn birthday(form: &CardForm, measure: &dyn TextMeasure) -> CardElement {
    let (w, h) = (750u32, 500u32);
    let name = form.get(Field::Name);
    let size = fit(name, BIRTHDAY_NAME, measure);

    let nodes = vec![
        LayoutNode::fill(Rect::new(0, 0, w, 120), [44, 33, 96, 255]),
        LayoutNode::fill(Rect::new(0, 380, w, 120), [44, 33, 96, 255]),
        // ribbon behind the name
        LayoutNode::fill(Rect::new(440, 180, 250, 70), [190, 30, 70, 255]),
        LayoutNode::text(Rect::new(60, 190, 340, 60), "Happy Birthday", 44, GOLD, Align::Left),
        LayoutNode::text(
            Rect::new(455, 185, 220, 60),
            or_placeholder(name, "Full Name"),
            size,
            WHITE,
            Align::Center,
        ),
    ];

    CardElement {
        id: CardKind::Birthday.element_id().to_string(),
        width: w,
        height: h,
        background: [76, 29, 149, 255],
        nodes,
    }
}

fn anniversary(form: &CardForm, measure: &dyn TextMeasure) -> CardElement {
    let (w, h) = (1000u32, 550u32);
    let name = form.get(Field::Name);
    let designation = form.get(Field::Designation);
    let years = form
        .get(Field::YearsOfService)
        .parse::<u32>()
        .map(ordinal)
        .unwrap_or_else(|_| "X".to_string());

    let nodes = vec![
        LayoutNode::fill(Rect::new(0, 0, w, 12), GOLD),
        LayoutNode::fill(Rect::new(0, (h - 12) as i32, w, 12), GOLD),
        LayoutNode::text(Rect::new(130, 124, 140, 60), years, 36, GOLD, Align::Left),
        LayoutNode::text(Rect::new(300, 124, 560, 60), "Work Anniversary", 36, WHITE, Align::Left),
        LayoutNode::text(
            Rect::new(100, 238, 800, 36),
            or_placeholder(name, "Enter Name"),
            fit(name, ANNIVERSARY_NAME, measure),
            WHITE,
            Align::Center,
        ),
        LayoutNode::text(
            Rect::new(100, 280, 800, 32),
            or_placeholder(designation, "Enter Designation"),
            fit(designation, ANNIVERSARY_DESIGNATION, measure),
            [230, 230, 230, 255],
            Align::Center,
        ),
    ];

    CardElement {
        id: CardKind::Anniversary.element_id().to_string(),
        width: w,
        height: h,
        background: [15, 23, 42, 255],
        nodes,
    }
}

fn onboarding(form: &CardForm, measure: &dyn TextMeasure) -> CardElement {
    let (w, h) = (800u32, 810u32);
    let name = form.get(Field::Name);
    let designation = form.get(Field::Designation);

    let mut nodes = vec![
        LayoutNode::fill(Rect::new(0, 0, w, 128), TEAL),
        LayoutNode::text(Rect::new(0, 30, w, 44), "WELCOME", 36, WHITE, Align::Center),
        LayoutNode::text(Rect::new(0, 80, w, 24), "to the team", 16, WHITE, Align::Center),
        LayoutNode::image(
            Rect::new(40, 160, 160, 160),
            form.image(ImageSlot::User),
            ImageShape::Circle,
            PHOTO_EMPTY,
        ),
        LayoutNode::text(
            Rect::new(230, 180, 360, 36),
            or_placeholder(name, "Your Name"),
            fit(name, ONBOARDING_NAME, measure),
            TEAL,
            Align::Left,
        ),
        LayoutNode::text(
            Rect::new(230, 222, 360, 26),
            or_placeholder(designation, "Job Title"),
            fit(designation, ONBOARDING_DESIGNATION, measure),
            MUTED,
            Align::Left,
        ),
    ];

    let details = [
        (Field::Location, "City / Office Location"),
        (Field::Email, "username@company.com"),
        (Field::Phone, "9876XXXXX"),
        (Field::Education, "Education"),
    ];
    for (i, (field, placeholder)) in details.iter().enumerate() {
        let y = 262 + i as i32 * 22;
        nodes.push(LayoutNode::text(
            Rect::new(230, y, 520, 20),
            or_placeholder(form.get(*field), placeholder),
            14,
            INK,
            Align::Left,
        ));
    }

    let welcome = or_placeholder(
        form.get(Field::WelcomeMessage),
        "Write a short welcome message or professional summary",
    );
    nodes.push(LayoutNode::fill(Rect::new(40, 370, w - 80, 2), TEAL));
    nodes.push(LayoutNode::paragraph(
        Rect::new(40, 390, w - 80, 150),
        wrap_lines(welcome, 16.0, (w - 80) as f32, 5, measure),
        16,
        INK,
        Align::Left,
    ));

    // manager panel
    nodes.push(LayoutNode::fill(Rect::new(40, 570, w - 80, 200), [236, 245, 243, 255]));
    nodes.push(LayoutNode::image(
        Rect::new(64, 594, 56, 56),
        form.image(ImageSlot::Manager),
        ImageShape::Circle,
        PHOTO_EMPTY,
    ));
    let manager_message = form.get(Field::ManagerMessage);
    let quoted = format!(
        "\"{}\"",
        or_placeholder(
            manager_message,
            "A welcome message from your manager will appear here. This typically includes a greeting and brief introduction to the team."
        )
    );
    nodes.push(LayoutNode::paragraph(
        Rect::new(140, 594, 596, 120),
        wrap_lines(&quoted, 14.0, 596.0, 5, measure),
        14,
        TEAL,
        Align::Left,
    ));
    nodes.push(LayoutNode::text(
        Rect::new(140, 730, 596, 22),
        or_placeholder(form.get(Field::ReportingManager), "Manager Name"),
        15,
        INK,
        Align::Left,
    ));

    CardElement {
        id: CardKind::Onboarding.element_id().to_string(),
        width: w,
        height: h,
        background: WHITE,
        nodes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::autofit::AdvanceTable;
    use crate::form::{reduce, FormAction};
    use crate::rendering::layout::NodeKind;

    fn with(kind: CardKind, edits: &[(Field, &str)]) -> CardForm {
        edits.iter().fold(CardForm::new(kind), |f, (field, v)| {
            reduce(&f, FormAction::SetText(*field, v.to_string())).0
        })
    }

    fn texts(el: &CardElement) -> Vec<String> {
        el.nodes.iter().filter_map(|n| n.text_content()).collect()
    }

    #[test]
    fn all_fit_params_are_valid() {
        for p in [BIRTHDAY_NAME, ANNIVERSARY_NAME, ANNIVERSARY_DESIGNATION, ONBOARDING_NAME, ONBOARDING_DESIGNATION] {
            assert!(FitParams::new(p.base_px, p.min_px, p.max_width_px).is_ok());
        }
    }

    #[test]
    fn empty_birthday_shows_placeholder_at_base_size() {
        let el = layout_card(&CardForm::new(CardKind::Birthday), &AdvanceTable::new());
        assert_eq!(el.id, "birthday-card");
        let name = el.nodes.iter().find(|n| n.text_content().as_deref() == Some("Full Name")).unwrap();
        match &name.kind {
            NodeKind::Text { font_px, .. } => assert_eq!(*font_px, 22),
            _ => unreachable!(),
        }
    }

    #[test]
    fn long_birthday_name_shrinks() {
        let table = AdvanceTable::new();
        let form = with(CardKind::Birthday, &[(Field::Name, "Maximiliana Wolfeschlegel")]);
        let size = field_size(&form, Field::Name, &table).unwrap();
        assert!(size < 22 && size >= 16);
    }

    #[test]
    fn anniversary_shows_ordinal_years() {
        let form = with(CardKind::Anniversary, &[(Field::YearsOfService, "12")]);
        let el = layout_card(&form, &AdvanceTable::new());
        assert!(texts(&el).contains(&"12th".to_string()));

        let el = layout_card(&CardForm::new(CardKind::Anniversary), &AdvanceTable::new());
        let t = texts(&el);
        assert!(t.contains(&"X".to_string()));
        assert!(t.contains(&"Enter Name".to_string()));
        assert!(t.contains(&"Enter Designation".to_string()));
    }

    #[test]
    fn onboarding_carries_image_slots() {
        let form = CardForm::new(CardKind::Onboarding);
        let (form, _) = reduce(&form, FormAction::SetImage(ImageSlot::Manager, Some("https://x/m.png".into())));
        let el = layout_card(&form, &AdvanceTable::new());
        let sources: Vec<Option<String>> = el
            .nodes
            .iter()
            .filter_map(|n| match &n.kind {
                NodeKind::Image { source, .. } => Some(source.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(sources, vec![None, Some("https://x/m.png".to_string())]);
    }

    #[test]
    fn nodes_stay_inside_the_card() {
        for kind in CardKind::ALL {
            let el = layout_card(&CardForm::new(kind), &AdvanceTable::new());
            for n in &el.nodes {
                assert!(n.rect.x >= 0 && n.rect.y >= 0, "{:?}", n);
                assert!(n.rect.x as u32 + n.rect.width <= el.width, "{:?}", n);
                assert!(n.rect.y as u32 + n.rect.height <= el.height, "{:?}", n);
            }
        }
    }
}
