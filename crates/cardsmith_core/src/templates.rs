//! crates/cardsmith_core/src/templates.rs
//!
//! The static prompt-template catalog and the renderer that personalizes
//! a template for one contact.

use crate::domain::{Contact, PromptTemplate};

/// The placeholder substituted with the contact's first name.
pub const FIRST_NAME_PLACEHOLDER: &str = "{firstName}";

/// The fixed, read-only theme catalog. Users pick one by id.
pub const CATALOG: &[PromptTemplate] = &[
    PromptTemplate {
        id: "birthday-classic",
        name: "Classic Birthday",
        template: "A warm, festive birthday greeting card featuring the name \"{firstName}\" in elegant hand lettering, surrounded by balloons, confetti and a frosted cake, soft pastel palette, no other text",
    },
    PromptTemplate {
        id: "holiday-winter",
        name: "Winter Holidays",
        template: "A cozy winter holiday card with the name \"{firstName}\" written in golden script over a snowy village scene at dusk, twinkling lights, watercolor style, no other text",
    },
    PromptTemplate {
        id: "thank-you-floral",
        name: "Floral Thank You",
        template: "A thank-you card with the name \"{firstName}\" in refined serif type framed by a delicate wreath of wildflowers and eucalyptus, cream background, no other text",
    },
    PromptTemplate {
        id: "congrats-bold",
        name: "Bold Congratulations",
        template: "A vibrant congratulations card shouting the name \"{firstName}\" in bold 3D letters bursting through metallic streamers and fireworks, studio lighting, no other text",
    },
    PromptTemplate {
        id: "new-year-gold",
        name: "Golden New Year",
        template: "An elegant new-year greeting card with the name \"{firstName}\" embossed in gold foil on deep midnight blue, art deco ornaments and champagne sparkle, no other text",
    },
];

/// Looks a template up by its id.
pub fn find_template(id: &str) -> Option<&'static PromptTemplate> {
    CATALOG.iter().find(|t| t.id == id)
}

/// Renders a template for one contact: the `{firstName}` placeholder is
/// substring-replaced with the text before the first space of the name,
/// and an optional custom detail is appended as a trailing clause.
pub fn render_prompt(template: &PromptTemplate, contact: &Contact) -> String {
    let mut prompt = template
        .template
        .replace(FIRST_NAME_PLACEHOLDER, contact.first_name());
    if let Some(detail) = contact
        .custom_prompt_detail
        .as_deref()
        .filter(|d| !d.is_empty())
    {
        prompt.push_str(&format!(" Incorporate this personal detail: {detail}."));
    }
    prompt
}

//=========================================================================================
// Tests
//=========================================================================================
