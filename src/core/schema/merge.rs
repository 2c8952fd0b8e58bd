//! Structural merge of schema documents.

use serde_json::{Map, Value};

/// Merge `overlay` into `base`
///
/// Objects present on both sides are merged key by key; any other
/// conflict is resolved in favor of `overlay`. Keys new to `base` are
/// appended after its existing keys. The walk uses an explicit stack,
/// so nesting depth is bounded only by memory.
pub fn merge_schema(base: Value, overlay: Value) -> Value {
    let (mut result, overlay) = match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => (base, overlay),
        (_, overlay) => return overlay,
    };

    // Each entry: path of keys below the root, overlay object to apply there
    let mut stack: Vec<(Vec<String>, Map<String, Value>)> = vec![(Vec::new(), overlay)];

    while let Some((path, overlay)) = stack.pop() {
        let Some(target) = object_at(&mut result, &path) else {
            continue;
        };

        for (key, value) in overlay {
            match (target.get(&key), value) {
                (Some(Value::Object(_)), Value::Object(nested)) => {
                    let mut child_path = path.clone();
                    child_path.push(key);
                    stack.push((child_path, nested));
                }
                (_, value) => {
                    target.insert(key, value);
                }
            }
        }
    }

    Value::Object(result)
}

fn object_at<'a>(root: &'a mut Map<String, Value>, path: &[String]) -> Option<&'a mut Map<String, Value>> {
    let mut current = root;
    for key in path {
        current = current.get_mut(key)?.as_object_mut()?;
    }
    Some(current)
}
