// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Branch-name derivation, per spec.md §6: lowercase the title, collapse
//! runs of non-alphanumerics to single hyphens, strip leading/trailing
//! hyphens, truncate to 40 characters, then wrap as `task-<id>-<slug>`.

const MAX_SLUG_LEN: usize = 40;

pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_hyphen = false;
    for ch in title.chars().flat_map(char::to_lowercase) {
        if ch.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(ch);
        } else {
            pending_hyphen = true;
        }
    }
    slug.truncate(MAX_SLUG_LEN);
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

pub fn branch_name(task_id: &str, title: &str) -> String {
    format!("task-{task_id}-{}", slugify(title))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_non_alphanumerics_to_single_hyphens() {
        assert_eq!(slugify("Add README!! & docs"), "add-readme-docs");
    }

    #[test]
    fn strips_leading_and_trailing_hyphens() {
        assert_eq!(slugify("  -- leading and trailing -- "), "leading-and-trailing");
    }

    #[test]
    fn truncates_to_forty_characters_without_a_trailing_hyphen() {
        let title = "a very long title that definitely exceeds forty characters in length";
        let slug = slugify(title);
        assert!(slug.len() <= MAX_SLUG_LEN);
        assert!(!slug.ends_with('-'));
    }

    #[test]
    fn branch_name_has_the_expected_shape() {
        assert_eq!(branch_name("tsk-abc123", "Add README"), "task-tsk-abc123-add-readme");
    }
}
