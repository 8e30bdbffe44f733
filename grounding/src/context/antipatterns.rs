//! Anti-pattern detection over selected objects.
//!
//! Rule-based checks for object/query combinations that are known to
//! produce slow or failing queries. Findings are advisory: they ride along
//! with the schema context and never block it.

/// Words that suggest the user bounded the query in time.
const DATE_BOUND_HINTS: [&str; 9] = [
    "today",
    "yesterday",
    "week",
    "month",
    "quarter",
    "year",
    "recent",
    "last",
    "since",
];

/// Activity objects that grow without bound in most orgs.
const ACTIVITY_OBJECTS: [&str; 3] = ["Task", "Event", "EmailMessage"];

/// Run every rule over the selected object set and raw query text.
pub fn detect_anti_patterns(objects: &[String], query: &str) -> Vec<String> {
    let mut warnings = Vec::new();
    let query_lower = query.to_lowercase();

    for object in objects {
        if object.ends_with("History") {
            warnings.push(format!(
                "{object} is a history object; it cannot be filtered on arbitrary fields and \
                 large orgs hold millions of rows. Prefer filtering by parent record id."
            ));
        }
        if object.ends_with("Feed") {
            warnings.push(format!(
                "{object} is a feed object with very high row counts; queries without a \
                 parent-record filter will be slow or fail."
            ));
        }
        if object == "ContentDocumentLink" {
            warnings.push(
                "ContentDocumentLink requires a filter on ContentDocumentId or LinkedEntityId; \
                 unfiltered queries are rejected by the platform."
                    .to_string(),
            );
        }
    }

    let has_date_bound = DATE_BOUND_HINTS.iter().any(|h| query_lower.contains(h));
    for object in objects {
        if ACTIVITY_OBJECTS.iter().any(|a| a == object) && !has_date_bound {
            warnings.push(format!(
                "{object} grows without bound in most orgs; add a date filter (e.g. \
                 CreatedDate = LAST_N_DAYS:90) to keep the query selective."
            ));
        }
    }

    if objects.len() > 3 {
        warnings.push(format!(
            "{} objects matched this request; SOQL cannot join arbitrary objects, so the \
             generated query will likely need to be narrowed to one or two.",
            objects.len()
        ));
    }

    warnings
}
