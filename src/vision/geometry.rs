//! Axis-aligned rectangles in image pixel space

use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle (left/top inclusive, right/bottom exclusive)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rect {
    /// Create a rectangle from its four edges
    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self { left, top, right, bottom }
    }

    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }

    /// Area in square pixels (i64 so large frames cannot overflow)
    pub fn area(&self) -> i64 {
        i64::from(self.width()) * i64::from(self.height())
    }

    /// Same rectangle with swapped edges put back in order
    pub fn normalized(&self) -> Self {
        Self {
            left: self.left.min(self.right),
            top: self.top.min(self.bottom),
            right: self.left.max(self.right),
            bottom: self.top.max(self.bottom),
        }
    }

    /// Smallest rectangle containing both `self` and `other`
    pub fn expand(&self, other: &Rect) -> Rect {
        Rect {
            left: self.left.min(other.left),
            top: self.top.min(other.top),
            right: self.right.max(other.right),
            bottom: self.bottom.max(other.bottom),
        }
    }

    /// Near-containment test.
    ///
    /// `margin` lets `self` poke out of `outer` by up to that many pixels on
    /// every side, which absorbs OCR box jitter around a printed tag edge.
    pub fn is_inside(&self, outer: &Rect, margin: i32) -> bool {
        self.left + margin >= outer.left
            && self.top + margin >= outer.top
            && self.bottom <= outer.bottom + margin
            && self.right <= outer.right + margin
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_covers_both() {
        let a = Rect::new(10, 10, 20, 20);
        let b = Rect::new(15, 5, 40, 18);
        assert_eq!(a.expand(&b), Rect::new(10, 5, 40, 20));
        assert_eq!(b.expand(&a), a.expand(&b));
    }

    #[test]
    fn test_is_inside_reflexive() {
        let rects = [
            Rect::new(0, 0, 0, 0),
            Rect::new(3, 7, 100, 40),
            Rect::new(-20, -5, 12, 9),
        ];
        for r in rects {
            for margin in [0, 1, 10] {
                assert!(r.is_inside(&r, margin), "{:?} with margin {}", r, margin);
            }
        }
    }

    #[test]
    fn test_is_inside_margin() {
        let tag = Rect::new(100, 100, 300, 200);
        let name = Rect::new(95, 110, 305, 150);

        assert!(!name.is_inside(&tag, 0));
        assert!(!name.is_inside(&tag, 4));
        assert!(name.is_inside(&tag, 5));
        assert!(name.is_inside(&tag, 10));
    }

    #[test]
    fn test_dimensions() {
        let r = Rect::new(10, 20, 40, 60);
        assert_eq!(r.width(), 30);
        assert_eq!(r.height(), 40);
        assert_eq!(r.area(), 1200);
    }

    #[test]
    fn test_normalized() {
        let r = Rect::new(50, 60, 10, 20).normalized();
        assert_eq!(r, Rect::new(10, 20, 50, 60));
        assert!(r.height() >= 0);
    }
}
