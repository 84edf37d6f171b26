//! Single-threaded reference for the signing pipeline

use hashpipe_core::Item;

use crate::signer::Signer;
use crate::stages::{COMBINE_SEPARATOR, MULTI_HASH_WIDTH};

/// Compute SingleHash -> MultiHash -> CombineResults without any concurrency.
///
/// The concurrent pipeline must always produce the same string; only its
/// timing differs.
pub fn sign_sequential<I>(signer: &dyn Signer, items: I) -> String
where
    I: IntoIterator<Item = Item>,
{
    let mut results: Vec<String> = items
        .into_iter()
        .map(|item| {
            let data = item.into_data();
            let single = format!("{}~{}", signer.crc32(&data), signer.crc32(&signer.md5(&data)));
            (0..MULTI_HASH_WIDTH)
                .map(|th| signer.crc32(&format!("{th}{single}")))
                .collect::<String>()
        })
        .collect();
    results.sort();
    results.join(COMBINE_SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signer::DataSigner;

    #[test]
    fn zero_matches_known_chain() {
        let signer = DataSigner::instant();
        assert_eq!(
            sign_sequential(&signer, [Item::Int(0)]),
            "29568666068035183841425683795340791879727309630931025356555"
        );
    }

    #[test]
    fn empty_input_is_empty_string() {
        let signer = DataSigner::instant();
        assert_eq!(sign_sequential(&signer, Vec::new()), "");
    }

    #[test]
    fn int_and_string_forms_agree() {
        let signer = DataSigner::instant();
        assert_eq!(
            sign_sequential(&signer, [Item::Int(5)]),
            sign_sequential(&signer, [Item::from("5")])
        );
    }

    #[test]
    fn input_order_does_not_matter() {
        let signer = DataSigner::instant();
        let forward: Vec<Item> = (1..=4).map(Item::Int).collect();
        let backward: Vec<Item> = (1..=4).rev().map(Item::Int).collect();
        assert_eq!(
            sign_sequential(&signer, forward),
            sign_sequential(&signer, backward)
        );
    }
}
