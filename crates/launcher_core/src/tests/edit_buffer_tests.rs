use super::*;

fn buffer(items: &[&str]) -> EditBuffer<String> {
    EditBuffer::open(items.iter().map(|item| item.to_string()).collect())
}

fn key(item: &String) -> String {
    item.to_lowercase()
}

#[test]
fn toggle_adds_missing_items_at_the_top() {
    let mut items = buffer(&["a", "b"]);
    assert!(items.toggle("c".to_string(), key));
    assert_eq!(items.items(), ["c", "a", "b"]);
}

#[test]
fn toggle_removes_present_items_by_key() {
    let mut items = buffer(&["a", "b", "c"]);
    assert!(!items.toggle("B".to_string(), key));
    assert_eq!(items.items(), ["a", "c"]);
}

#[test]
fn reorder_moves_item_to_target_index() {
    let mut items = buffer(&["a", "b", "c", "d"]);
    assert!(items.reorder(0, 2));
    assert_eq!(items.items(), ["b", "c", "a", "d"]);

    assert!(items.reorder(3, 0));
    assert_eq!(items.items(), ["d", "b", "c", "a"]);

    let mut sorted = items.clone().into_items();
    sorted.sort();
    assert_eq!(sorted, ["a", "b", "c", "d"]);
}

#[test]
fn reorder_out_of_bounds_is_a_no_op() {
    let mut items = buffer(&["a", "b"]);
    assert!(!items.reorder(2, 0));
    assert!(!items.reorder(0, 2));
    assert_eq!(items.items(), ["a", "b"]);

    let mut empty = buffer(&[]);
    assert!(!empty.reorder(0, 0));
}

#[test]
fn drag_swaps_once_per_full_row() {
    let mut drag = DragReorder::start(0, 4, 50.0);
    assert!(drag.drag_by(30.0).is_empty());
    assert_eq!(drag.drag_by(30.0), [(0, 1)]);
    assert_eq!(drag.current_index(), 1);
    assert!((drag.pending_offset() - 10.0).abs() < f32::EPSILON);
}

#[test]
fn drag_follows_the_dragged_item() {
    let mut drag = DragReorder::start(1, 5, 40.0);
    assert_eq!(drag.drag_by(125.0), [(1, 2), (2, 3), (3, 4)]);
    assert_eq!(drag.current_index(), 4);

    assert_eq!(drag.drag_by(-80.0), [(4, 3), (3, 2)]);
    assert_eq!(drag.current_index(), 2);
}

#[test]
fn drag_stops_at_the_ends() {
    let mut drag = DragReorder::start(1, 3, 10.0);
    assert_eq!(drag.drag_by(100.0), [(1, 2)]);
    assert_eq!(drag.current_index(), 2);
    assert_eq!(drag.pending_offset(), 0.0);

    assert_eq!(drag.drag_by(-10.0), [(2, 1)]);
}

#[test]
fn drag_ignores_degenerate_rows() {
    let mut drag = DragReorder::start(0, 3, 0.0);
    assert!(drag.drag_by(500.0).is_empty());
    assert_eq!(drag.current_index(), 0);
}
