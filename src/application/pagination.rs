//! Page-number pagination over resolved collections.

use serde::Serialize;

/// A page slice plus its position descriptor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub descriptor: PageDescriptor,
}

/// Position metadata for one page of results.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageDescriptor {
    pub current_page: usize,
    pub total_pages: usize,
    pub total_posts: usize,
    pub per_page: usize,
    pub has_previous: bool,
    pub has_next: bool,
    pub previous_page: Option<usize>,
    pub next_page: Option<usize>,
}

/// Slice one page out of `items`.
///
/// `page` is clamped into `[1, total_pages]`; out-of-range requests never
/// fail. An empty collection yields page 1 with an empty slice. A
/// `per_page` below 1 is treated as 1.
pub fn paginate<T: Clone>(items: &[T], page: usize, per_page: usize) -> Page<T> {
    let per_page = per_page.max(1);
    let total_posts = items.len();
    let total_pages = total_posts.div_ceil(per_page);

    if total_pages == 0 {
        return Page {
            items: Vec::new(),
            descriptor: PageDescriptor {
                current_page: 1,
                total_pages: 0,
                total_posts: 0,
                per_page,
                has_previous: false,
                has_next: false,
                previous_page: None,
                next_page: None,
            },
        };
    }

    let current_page = page.clamp(1, total_pages);
    let start = (current_page - 1) * per_page;
    let end = (start + per_page).min(total_posts);
    let has_previous = current_page > 1;
    let has_next = current_page < total_pages;

    Page {
        items: items[start..end].to_vec(),
        descriptor: PageDescriptor {
            current_page,
            total_pages,
            total_posts,
            per_page,
            has_previous,
            has_next,
            previous_page: has_previous.then(|| current_page - 1),
            next_page: has_next.then(|| current_page + 1),
        },
    }
}
