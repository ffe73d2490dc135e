//! Sort specification parsing.

use docrepo_core::query::{Direction, OrderBy};

use crate::descriptor::Descriptor;

/// Parse a comma-separated `[+|-]field` list into ordering keys.
///
/// Field names are serialized keys and are translated to store-native names
/// through the descriptor; unknown names are used verbatim. `-` sorts
/// descending, `+` or no prefix ascending. Repeating a field keeps its first
/// position and takes the last direction.
pub fn parse_sort<E>(spec: &str, descriptor: &Descriptor<E>) -> Vec<OrderBy> {
    let mut order: Vec<OrderBy> = Vec::new();

    for token in spec.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        let (direction, name) = if let Some(rest) = token.strip_prefix('-') {
            (Direction::Descending, rest.trim())
        } else if let Some(rest) = token.strip_prefix('+') {
            (Direction::Ascending, rest.trim())
        } else {
            (Direction::Ascending, token)
        };
        if name.is_empty() {
            continue;
        }

        let field = descriptor.wire_name(name).unwrap_or(name).to_string();
        match order.iter_mut().find(|o| o.field == field) {
            Some(existing) => existing.direction = direction,
            None => order.push(OrderBy { field, direction }),
        }
    }

    order
}
