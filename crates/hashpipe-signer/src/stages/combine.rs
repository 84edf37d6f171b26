//! CombineResults: sort everything and join with `_`

use hashpipe_core::{PipelineError, Stage, StreamReader, StreamWriter};

/// Separator between combined results
pub const COMBINE_SEPARATOR: &str = "_";

/// Collects the whole input, sorts it bytewise and emits exactly one joined
/// string. An empty input yields one empty string.
#[derive(Debug, Default, Clone, Copy)]
pub struct CombineResults;

impl CombineResults {
    pub const NAME: &'static str = "combine";
}

impl Stage for CombineResults {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn run(&self, input: StreamReader, output: &StreamWriter) -> Result<(), PipelineError> {
        let mut results = Vec::new();
        for item in input {
            results.push(item?.into_data());
        }
        log::debug!("combining {} results", results.len());
        results.sort_unstable();
        output.send(results.join(COMBINE_SEPARATOR))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hashpipe_core::{Item, Pipeline};

    fn combine(input: Vec<Item>) -> Vec<Item> {
        Pipeline::new()
            .stage(CombineResults)
            .execute(input)
            .unwrap()
            .items
    }

    #[test]
    fn sorts_and_joins() {
        let out = combine(vec!["b".into(), "a".into(), "c".into()]);
        assert_eq!(out, vec![Item::from("a_b_c")]);
    }

    #[test]
    fn empty_input_emits_one_empty_string() {
        assert_eq!(combine(Vec::new()), vec![Item::from("")]);
    }

    #[test]
    fn single_item_has_no_separator() {
        assert_eq!(combine(vec!["only".into()]), vec![Item::from("only")]);
    }

    #[test]
    fn byte_order_not_numeric() {
        let out = combine(vec![Item::Int(10), Item::Int(9), "B".into(), "a".into()]);
        assert_eq!(out, vec![Item::from("10_9_B_a")]);
    }

    #[test]
    fn duplicates_are_kept() {
        let out = combine(vec!["x".into(), "x".into()]);
        assert_eq!(out, vec![Item::from("x_x")]);
    }
}
