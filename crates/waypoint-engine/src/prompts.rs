//! The fixed prompt set sent to the completion service for every place.
//!
//! Summary and statistics come back as markdown text. Category facts come
//! back as a JSON array of `{title, description}` objects.

use waypoint_core::Place;

/// Bumped whenever prompt wording or response contracts change.
pub const PROMPT_SET_VERSION: u32 = 1;

/// Categories for which one facts prompt is issued, in output order.
pub const FACT_CATEGORIES: [&str; 13] = [
    "geography",
    "historical events",
    "science",
    "art",
    "authors",
    "musicians",
    "games",
    "sports",
    "leisure",
    "famous buildings",
    "celebrities",
    "pop culture",
    "interesting facts",
];

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PromptKind {
    Summary,
    Statistics,
    Facts { category: &'static str },
}

/// How a completion for a prompt is turned into content items.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResponseContract {
    /// Free text, wrapped into one item under the given title.
    Text { title: String },
    /// JSON array of `{title, description}` objects.
    FactList,
}

#[derive(Clone, Debug)]
pub struct Prompt {
    pub kind: PromptKind,
    pub text: String,
    pub contract: ResponseContract,
}

impl Prompt {
    pub fn label(&self) -> String {
        match &self.kind {
            PromptKind::Summary => "summary".into(),
            PromptKind::Statistics => "statistics".into(),
            PromptKind::Facts { category } => format!("facts:{category}"),
        }
    }
}

/// Build the full prompt set for `place`, in output order.
pub fn build_prompt_set(place: &Place) -> Vec<Prompt> {
    let mut prompts = Vec::with_capacity(2 + FACT_CATEGORIES.len());

    prompts.push(Prompt {
        kind: PromptKind::Summary,
        text: format!(
            "Write a detailed summary description of the city at {place}. Provide as Markdown."
        ),
        contract: ResponseContract::Text {
            title: place.to_string(),
        },
    });

    prompts.push(Prompt {
        kind: PromptKind::Statistics,
        text: format!(
            "Get statistics of the city at {place}. Get population, life expectancy, access of \
             Internet, literacy rate, GDP, ethnic groups, religions, languages, imports, and \
             exports. Population and GDP should include units. For ethnic groups, religions, \
             languages, imports, and exports, also provide a percentage. Provide as Markdown."
        ),
        contract: ResponseContract::Text {
            title: format!("Statistics of {place}"),
        },
    });

    prompts.extend(FACT_CATEGORIES.iter().map(|&category| Prompt {
        kind: PromptKind::Facts { category },
        text: facts_prompt(place, category),
        contract: ResponseContract::FactList,
    }));

    prompts
}

fn facts_prompt(place: &Place, category: &str) -> String {
    format!(
        "Find one to three facts of the city at {place} in the category \"{category}\". \
         Write each description as an essay. Do not write duplicates. Be as descriptive and \
         specific as possible. No generalities. Add proper names, dates, locations, and other \
         identifiable information to each description. Develop an accurate title for each \
         description using only proper names, dates, and locations. Descriptions are Markdown. \
         Respond only with a JSON array of objects with the string fields \"title\" and \
         \"description\"."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_set_shape() {
        let place = Place::new("Philadelphia, Pennsylvania, USA");
        let prompts = build_prompt_set(&place);
        assert_eq!(prompts.len(), 15);
        assert_eq!(prompts[0].kind, PromptKind::Summary);
        assert_eq!(prompts[1].kind, PromptKind::Statistics);
        assert_eq!(prompts[2].kind, PromptKind::Facts { category: "geography" });
        assert_eq!(prompts[14].label(), "facts:interesting facts");
    }

    #[test]
    fn every_prompt_names_the_place() {
        let place = Place::new("Reno, Nevada, USA");
        for prompt in build_prompt_set(&place) {
            assert!(prompt.text.contains("Reno, Nevada, USA"), "{}", prompt.label());
        }
    }

    #[test]
    fn text_contracts_carry_titles() {
        let place = Place::new("Reno, Nevada, USA");
        let prompts = build_prompt_set(&place);
        assert_eq!(
            prompts[0].contract,
            ResponseContract::Text { title: "Reno, Nevada, USA".into() }
        );
        assert_eq!(
            prompts[1].contract,
            ResponseContract::Text { title: "Statistics of Reno, Nevada, USA".into() }
        );
        assert!(prompts[2..].iter().all(|p| p.contract == ResponseContract::FactList));
    }

    #[test]
    fn category_prompts_are_distinct() {
        let place = Place::new("X");
        let prompts = build_prompt_set(&place);
        for category in FACT_CATEGORIES {
            let needle = format!("category \"{category}\"");
            assert_eq!(prompts.iter().filter(|p| p.text.contains(&needle)).count(), 1);
        }
    }
}
