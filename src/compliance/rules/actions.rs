//! Action rule table.
//!
//! Parts 1 to 3 deny a fixed list of action types; part 4 switches to an
//! allow list and restricts the trigger keys of every additional-actions
//! dictionary.

use crate::compliance::types::PdfAPart;
use crate::compliance::violation::RuleId;

/// Where an action was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionContext {
    /// Catalog /OpenAction
    OpenAction,
    /// Catalog /AA
    CatalogAdditionalActions,
    /// Page /AA
    PageAdditionalActions,
    /// Annotation /A or /AA, form field /AA
    Annotation,
    /// Outline item /A
    Outline,
}

/// Which action types are acceptable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionPolicy {
    /// Everything except the listed types
    DenyList(&'static [&'static str]),
    /// Only the listed types
    AllowList(&'static [&'static str]),
}

impl ActionPolicy {
    /// Whether an action of type `action_type` passes.
    pub fn permits(&self, action_type: &str) -> bool {
        match self {
            ActionPolicy::DenyList(denied) => !denied.contains(&action_type),
            ActionPolicy::AllowList(allowed) => allowed.contains(&action_type),
        }
    }
}

/// What an additional-actions dictionary may contain in a context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdditionalActionsPolicy {
    /// The AA key itself is a violation
    Forbidden(RuleId),
    /// Only the listed trigger keys
    AllowedKeys(&'static [&'static str]),
    /// Any trigger key; the actions are still checked
    Unrestricted,
}

/// Action rules of one part.
#[derive(Debug)]
pub struct ActionRules {
    part: PdfAPart,
    actions: ActionPolicy,
    named_actions: &'static [&'static str],
    catalog_aa: AdditionalActionsPolicy,
    page_aa: AdditionalActionsPolicy,
    annotation_aa: AdditionalActionsPolicy,
}

const DENIED_ACTIONS: &[&str] = &[
    "Launch",
    "Sound",
    "Movie",
    "Hide",
    "ResetForm",
    "ImportData",
    "SetOCGState",
    "Rendition",
    "Trans",
    "GoTo3DView",
    "JavaScript",
];

const PART4_ALLOWED_ACTIONS: &[&str] = &["GoTo", "GoToR", "GoToE", "URI", "SubmitForm", "Named"];

const NAMED_ACTIONS: &[&str] = &["NextPage", "PrevPage", "FirstPage", "LastPage"];

/// Trigger keys an AA dictionary may use in part 4.
pub const PART4_ALLOWED_TRIGGERS: &[&str] =
    &["E", "X", "D", "U", "Fo", "Bl", "O", "C", "PO", "PC", "PV", "PI"];

static PART1: ActionRules = ActionRules {
    part: PdfAPart::Part1,
    actions: ActionPolicy::DenyList(DENIED_ACTIONS),
    named_actions: NAMED_ACTIONS,
    catalog_aa: AdditionalActionsPolicy::Forbidden(RuleId::CatalogAdditionalActionsNotAllowed),
    page_aa: AdditionalActionsPolicy::Unrestricted,
    annotation_aa: AdditionalActionsPolicy::Unrestricted,
};

const PARTS_2_AND_3: ActionRules = ActionRules {
    part: PdfAPart::Part2,
    actions: ActionPolicy::DenyList(DENIED_ACTIONS),
    named_actions: NAMED_ACTIONS,
    catalog_aa: AdditionalActionsPolicy::Forbidden(RuleId::CatalogAdditionalActionsNotAllowed),
    page_aa: AdditionalActionsPolicy::Forbidden(RuleId::PageAdditionalActionsNotAllowed),
    annotation_aa: AdditionalActionsPolicy::Unrestricted,
};

static PART2: ActionRules = PARTS_2_AND_3;

static PART3: ActionRules = ActionRules {
    part: PdfAPart::Part3,
    ..PARTS_2_AND_3
};

static PART4: ActionRules = ActionRules {
    part: PdfAPart::Part4,
    actions: ActionPolicy::AllowList(PART4_ALLOWED_ACTIONS),
    named_actions: NAMED_ACTIONS,
    catalog_aa: AdditionalActionsPolicy::AllowedKeys(PART4_ALLOWED_TRIGGERS),
    page_aa: AdditionalActionsPolicy::AllowedKeys(PART4_ALLOWED_TRIGGERS),
    annotation_aa: AdditionalActionsPolicy::AllowedKeys(PART4_ALLOWED_TRIGGERS),
};

impl ActionRules {
    /// Table for a part.
    pub fn for_part(part: PdfAPart) -> &'static ActionRules {
        match part {
            PdfAPart::Part1 => &PART1,
            PdfAPart::Part2 => &PART2,
            PdfAPart::Part3 => &PART3,
            PdfAPart::Part4 => &PART4,
        }
    }

    /// The part this table belongs to.
    pub fn part(&self) -> PdfAPart {
        self.part
    }

    /// Action-type policy in a context. The type lists do not vary by
    /// context; only the AA policies do.
    pub fn action_policy(&self, _context: ActionContext) -> ActionPolicy {
        self.actions
    }

    /// Whether an action of `action_type` is acceptable in `context`.
    pub fn permits_action(&self, context: ActionContext, action_type: &str) -> bool {
        self.action_policy(context).permits(action_type)
    }

    /// Whether a Named action with name `name` is acceptable.
    pub fn permits_named_action(&self, name: &str) -> bool {
        self.named_actions.contains(&name)
    }

    /// Policy for an AA dictionary found in `context`.
    pub fn additional_actions_policy(&self, context: ActionContext) -> AdditionalActionsPolicy {
        match context {
            ActionContext::OpenAction | ActionContext::CatalogAdditionalActions => self.catalog_aa,
            ActionContext::PageAdditionalActions => self.page_aa,
            ActionContext::Annotation | ActionContext::Outline => self.annotation_aa,
        }
    }
}
