use std::cmp::Reverse;

use crate::{config::CellOrder, traits::Bounded};

impl CellOrder {
    /// Sort `items` in place according to this strategy.
    ///
    /// `ReadingOrder` groups items into bands: walking the items by y, a band
    /// starts at the first y not within `tolerance` of the current band's
    /// first y. Items are then ordered by (band, x, y). Two items whose
    /// y-origins differ by at least `tolerance` are always ordered by y.
    pub fn sort<T: Bounded>(&self, items: &mut [T], tolerance: u32) {
        match self {
            CellOrder::ReadingOrder => {
                items.sort_by_key(|item| {
                    let b = item.bounds();
                    (b.y, b.x)
                });
                let mut bands = Vec::with_capacity(items.len());
                let mut band = 0usize;
                let mut anchor = None;
                for item in items.iter() {
                    let y = item.bounds().y;
                    match anchor {
                        Some(a) if y - a < tolerance => {}
                        Some(_) => {
                            band += 1;
                            anchor = Some(y);
                        }
                        None => anchor = Some(y),
                    }
                    bands.push(band);
                }
                // items are already y-sorted, so band indices are non-decreasing
                let mut keyed: Vec<(usize, usize)> = bands.into_iter().enumerate().map(|(i, b)| (b, i)).collect();
                keyed.sort_by_key(|&(band, i)| {
                    let b = items[i].bounds();
                    (band, b.x, b.y)
                });
                apply_permutation(items, keyed.into_iter().map(|(_, i)| i).collect());
            }
            CellOrder::RasterScan => items.sort_by_key(|item| {
                let b = item.bounds();
                (b.y, b.x)
            }),
            CellOrder::AreaDescending => items.sort_by_key(|item| Reverse(item.bounds().area())),
        }
    }
}

/// Reorder so that position `k` receives the item previously at `order[k]`.
fn apply_permutation<T>(items: &mut [T], mut order: Vec<usize>) {
    for start in 0..order.len() {
        let mut current = start;
        while order[current] != start {
            let next = order[current];
            items.swap(current, next);
            order[current] = current;
            current = next;
        }
        order[current] = current;
    }
}
