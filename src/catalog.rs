//! Trade department taxonomy.
//!
//! Suppliers register under either a top-level department (`"HVAC"`) or a
//! subdepartment string of the form `"<Department> - <Sub>"`. Material
//! requests are raised against a top-level department and may narrow the
//! supplier audience with a list of subdepartments.

use serde::Serialize;

/// Separator between a department and its sub-trade.
pub const SUBDEPARTMENT_SEPARATOR: &str = " - ";

pub const DEPARTMENTS: [&str; 5] = ["Electrical", "Plumbing", "HVAC", "Fire Fighting", "Hardware"];

pub const SUBDEPARTMENTS: [&str; 28] = [
    "Electrical - PVC Conduit And accessories",
    "Electrical - GIBox",
    "Electrical - Cables and single",
    "Electrical - Core Wires",
    "Electrical - Light fitting",
    "Electrical - Switch Gear",
    "Electrical - Switches and Sockets",
    "Electrical - GI Conduits",
    "Plumbing - Upvc pipes and fittings",
    "Plumbing - Manhole covers",
    "Plumbing - PPR and Pex pipes",
    "Plumbing - Sound proof pipes & fittings",
    "Plumbing - Insulation for sound proof",
    "HVAC - AC Duct GI",
    "HVAC - VcD and Dumbers",
    "HVAC - AC Duct PI / phenolic",
    "HVAC - Grilles and diffusers",
    "HVAC - Duct insulation",
    "HVAC - Duct connector",
    "HVAC - Acoustic linear",
    "HVAC - Flexible duct",
    "HVAC - Copper pipes and fittings",
    "HVAC - Insulation for copper pipes",
    "Fire Fighting - Fire alarm system",
    "Fire Fighting - GI conduits",
    "Fire Fighting - Fire fighting material",
    "Fire Fighting - Emergency / Exit lights",
    "Hardware - Any",
];

/// A department together with its sub-trades, in catalog order.
#[derive(Debug, Clone, Serialize)]
pub struct DepartmentEntry {
    pub name: &'static str,
    pub subdepartments: Vec<&'static str>,
}

/// Every subdepartment listed under `department`, in catalog order.
pub fn subdepartments_by_department(department: &str) -> Vec<&'static str> {
    if department.is_empty() {
        return Vec::new();
    }
    let prefix = format!("{}{}", department, SUBDEPARTMENT_SEPARATOR);
    SUBDEPARTMENTS
        .iter()
        .copied()
        .filter(|sub| sub.starts_with(&prefix))
        .collect()
}

/// Department prefix of a subdepartment string.
///
/// Input without a separator is returned unchanged; missing or empty input
/// yields an empty string.
pub fn department_from_subdepartment(subdepartment: Option<&str>) -> &str {
    match subdepartment {
        Some(sub) if !sub.is_empty() => sub
            .split(SUBDEPARTMENT_SEPARATOR)
            .next()
            .unwrap_or_default(),
        _ => "",
    }
}

/// True when the two lists share at least one entry. Missing lists count as
/// empty.
pub fn has_matching_subdepartments<A, B>(supplier: Option<&[A]>, requested: Option<&[B]>) -> bool
where
    A: AsRef<str>,
    B: AsRef<str>,
{
    let supplier = supplier.unwrap_or(&[]);
    let requested = requested.unwrap_or(&[]);
    supplier
        .iter()
        .any(|s| requested.iter().any(|r| r.as_ref() == s.as_ref()))
}

pub fn is_known_department(value: &str) -> bool {
    DEPARTMENTS.contains(&value)
}

pub fn is_known_subdepartment(value: &str) -> bool {
    SUBDEPARTMENTS.contains(&value)
}

/// Whether a supplier registered under `supplier_department` should receive
/// requests raised for `request_department`.
///
/// A supplier registered under a bare department covers every sub-trade of
/// it. A supplier registered under a subdepartment matches on its prefix and,
/// when the request lists subdepartments, must be one of them.
pub fn supplier_covers(
    supplier_department: &str,
    request_department: &str,
    requested_subdepartments: Option<&[String]>,
) -> bool {
    if request_department.is_empty() {
        return false;
    }
    if supplier_department == request_department {
        return true;
    }
    if department_from_subdepartment(Some(supplier_department)) != request_department {
        return false;
    }
    match requested_subdepartments {
        Some(requested) if !requested.is_empty() => {
            has_matching_subdepartments(Some(std::slice::from_ref(&supplier_department)), Some(requested))
        }
        _ => true,
    }
}

/// Full taxonomy, grouped by department.
pub fn department_tree() -> Vec<DepartmentEntry> {
    DEPARTMENTS
        .iter()
        .map(|&name| DepartmentEntry {
            name,
            subdepartments: subdepartments_by_department(name),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn subdepartments_follow_catalog_order() {
        let hvac = subdepartments_by_department("HVAC");
        assert_eq!(hvac.len(), 10);
        assert_eq!(hvac.first(), Some(&"HVAC - AC Duct GI"));
        assert_eq!(hvac.last(), Some(&"HVAC - Insulation for copper pipes"));
    }

    #[test]
    fn unknown_or_empty_department_has_no_subdepartments() {
        assert!(subdepartments_by_department("").is_empty());
        assert!(subdepartments_by_department("Carpentry").is_empty());
        // "Fire" alone must not match the "Fire Fighting" prefix.
        assert!(subdepartments_by_department("Fire").is_empty());
    }

    #[test]
    fn department_prefix_is_extracted() {
        assert_eq!(
            department_from_subdepartment(Some("Electrical - GIBox")),
            "Electrical"
        );
        assert_eq!(
            department_from_subdepartment(Some("HVAC - AC Duct PI / phenolic")),
            "HVAC"
        );
        assert_eq!(department_from_subdepartment(Some("")), "");
        assert_eq!(department_from_subdepartment(None), "");
        assert_eq!(department_from_subdepartment(Some("Hardware")), "Hardware");
    }

    #[test]
    fn matching_tolerates_missing_lists() {
        assert!(has_matching_subdepartments(Some(&["A"][..]), Some(&["A", "B"][..])));
        assert!(!has_matching_subdepartments::<&str, &str>(None, Some(&["A"][..])));
        assert!(!has_matching_subdepartments::<&str, &str>(Some(&["A"][..]), None));
        assert!(!has_matching_subdepartments(Some(&["C"][..]), Some(&["A", "B"][..])));
    }

    #[test]
    fn bare_department_supplier_covers_every_sub_trade() {
        let requested = vec!["Electrical - GIBox".to_string()];
        assert!(supplier_covers("Electrical", "Electrical", Some(requested.as_slice())));
        assert!(supplier_covers("Electrical", "Electrical", None));
        assert!(!supplier_covers("Plumbing", "Electrical", None));
    }

    #[test]
    fn subdepartment_supplier_is_narrowed_by_request() {
        let requested = vec!["Electrical - Core Wires".to_string()];
        assert!(supplier_covers("Electrical - GIBox", "Electrical", None));
        assert!(supplier_covers("Electrical - GIBox", "Electrical", Some(&[][..])));
        assert!(!supplier_covers(
            "Electrical - GIBox",
            "Electrical",
            Some(requested.as_slice())
        ));
        assert!(supplier_covers(
            "Electrical - Core Wires",
            "Electrical",
            Some(requested.as_slice())
        ));
        assert!(!supplier_covers("HVAC - Duct connector", "Electrical", None));
    }

    #[test]
    fn tree_lists_every_subdepartment_once() {
        let total: usize = department_tree()
            .iter()
            .map(|entry| entry.subdepartments.len())
            .sum();
        assert_eq!(total, SUBDEPARTMENTS.len());
    }

    proptest! {
        #[test]
        fn subdepartments_carry_their_department_prefix(idx in 0usize..DEPARTMENTS.len()) {
            let department = DEPARTMENTS[idx];
            let prefix = format!("{} - ", department);
            for sub in subdepartments_by_department(department) {
                prop_assert!(sub.starts_with(&prefix));
                prop_assert_eq!(department_from_subdepartment(Some(sub)), department);
            }
        }

        #[test]
        fn arbitrary_text_never_panics(text in ".*") {
            let _ = subdepartments_by_department(&text);
            let _ = department_from_subdepartment(Some(&text));
            let _ = supplier_covers(&text, "Electrical", None);
        }
    }
}
