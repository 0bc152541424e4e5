//! The fixed, ordered sequence of wizard steps.
//!
//! Built once as a static and shared read-only by every session.
//! Predecessor and successor lookups are index arithmetic on the step's
//! ordinal.

use crate::texts;
use crate::validation::{self, Validator};

/// Identity of one step. Discriminants are the step ordinals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StepId {
    Name = 0,
    Description = 1,
    Category = 2,
    Price = 3,
    Image = 4,
}

impl StepId {
    pub fn as_str(self) -> &'static str {
        match self {
            StepId::Name => "name",
            StepId::Description => "description",
            StepId::Category => "category",
            StepId::Price => "price",
            StepId::Image => "image",
        }
    }

    /// Zero-based position in the registry.
    pub fn ordinal(self) -> usize {
        self as usize
    }
}

impl std::fmt::Display for StepId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One field-collection stage.
pub struct Step {
    pub id: StepId,
    /// Shown when the step is reached moving forward
    pub prompt: &'static str,
    /// Shown when the step is reached moving back
    pub reprompt: &'static str,
    pub validator: Validator,
    /// The validator needs the live category list
    pub requires_external_validation: bool,
}

impl std::fmt::Debug for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Step")
            .field("id", &self.id)
            .field("prompt", &self.prompt)
            .field("requires_external_validation", &self.requires_external_validation)
            .finish()
    }
}

/// Ordered step definitions.
#[derive(Debug)]
pub struct StepRegistry {
    steps: &'static [Step],
}

static STANDARD_STEPS: [Step; 5] = [
    Step {
        id: StepId::Name,
        prompt: texts::NAME_PROMPT,
        reprompt: texts::NAME_REPROMPT,
        validator: validation::validate_name,
        requires_external_validation: false,
    },
    Step {
        id: StepId::Description,
        prompt: texts::DESCRIPTION_PROMPT,
        reprompt: texts::DESCRIPTION_REPROMPT,
        validator: validation::validate_description,
        requires_external_validation: false,
    },
    Step {
        id: StepId::Category,
        prompt: texts::CATEGORY_PROMPT,
        reprompt: texts::CATEGORY_REPROMPT,
        validator: validation::validate_category,
        requires_external_validation: true,
    },
    Step {
        id: StepId::Price,
        prompt: texts::PRICE_PROMPT,
        reprompt: texts::PRICE_REPROMPT,
        validator: validation::validate_price,
        requires_external_validation: false,
    },
    Step {
        id: StepId::Image,
        prompt: texts::IMAGE_PROMPT,
        reprompt: texts::IMAGE_REPROMPT,
        validator: validation::validate_image,
        requires_external_validation: false,
    },
];

static STANDARD: StepRegistry = StepRegistry {
    steps: &STANDARD_STEPS,
};

impl StepRegistry {
    /// The product wizard: name → description → category → price → image.
    pub fn standard() -> &'static StepRegistry {
        &STANDARD
    }

    pub fn first(&self) -> StepId {
        self.steps[0].id
    }

    pub fn terminal(&self) -> StepId {
        self.steps[self.steps.len() - 1].id
    }

    pub fn is_terminal(&self, step: StepId) -> bool {
        step.ordinal() + 1 == self.steps.len()
    }

    /// The step after `step`, or `None` for the terminal step.
    pub fn next(&self, step: StepId) -> Option<StepId> {
        self.steps.get(step.ordinal() + 1).map(|s| s.id)
    }

    /// The step before `step`, or `None` for the first step.
    pub fn previous(&self, step: StepId) -> Option<StepId> {
        step.ordinal()
            .checked_sub(1)
            .and_then(|i| self.steps.get(i))
            .map(|s| s.id)
    }

    pub fn get(&self, step: StepId) -> &Step {
        &self.steps[step.ordinal()]
    }

    /// Step ids in order.
    pub fn ids(&self) -> impl Iterator<Item = StepId> + '_ {
        self.steps.iter().map(|s| s.id)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}
