//! Input event payloads delivered by the event dispatcher

/// One pointer of a motion event
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TouchPointer {
    pub pid: i32,
    pub x: f32,
    pub y: f32,
}

/// Touch or gesture event, coordinates in world space
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MotionEvent {
    pub pointers: Vec<TouchPointer>,
    /// Index into `pointers` of the pointer that triggered the event
    pub action_index: usize,
}

impl MotionEvent {
    /// Single-pointer event
    pub fn single(pid: i32, x: f32, y: f32) -> Self {
        Self {
            pointers: vec![TouchPointer { pid, x, y }],
            action_index: 0,
        }
    }

    pub fn pointer_count(&self) -> usize {
        self.pointers.len()
    }

    /// Pointer that triggered the event, if the index is valid
    pub fn action_pointer(&self) -> Option<&TouchPointer> {
        self.pointers.get(self.action_index)
    }
}

/// Key event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeyEvent {
    pub key_code: i32,
    pub repeat_count: i32,
}
