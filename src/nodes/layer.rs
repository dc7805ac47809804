use crate::nodes::{Node, Size};
use crate::tree::{NodeId, Tree};

/// An invisible grouping node whose size is the extent of its children.
///
/// The extent is measured from the layer's own origin `(0, 0)` to the
/// right/bottom-most edge of any child placed by its local transform, so a
/// single child at `(0, 0)` sized 400x300 gives a 400x300 layer.
#[derive(Debug, Default)]
pub struct Layer;

impl Layer {
    pub fn new() -> Self {
        Self
    }
}

impl Node for Layer {
    fn size(&self, tree: &Tree, id: NodeId) -> Size {
        tree.children(id)
            .iter()
            .filter_map(|&child| tree.local_extent(child))
            .fold(Size::zero(), |size, extent| {
                Size::new(
                    size.width.max(extent.right()),
                    size.height.max(extent.bottom()),
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::{Panel, Point};

    #[test]
    fn test_empty_layer_has_zero_size() {
        let mut tree = Tree::new();
        let layer = tree.insert(Layer::new());
        assert_eq!(tree.size(layer), Some(Size::zero()));
    }

    #[test]
    fn test_layer_covers_placed_children() {
        let mut tree = Tree::new();
        let layer = tree.insert(Layer::new());
        let a = tree.insert(Panel::new(400.0, 300.0));
        let b = tree.insert(Panel::new(50.0, 50.0));
        tree.add_child(layer, a);
        tree.add_child(layer, b);
        tree.set_position(b, Point::new(420.0, 100.0));
        tree.set_scale(b, 2.0);

        assert_eq!(tree.size(layer), Some(Size::new(520.0, 300.0)));
    }
}
