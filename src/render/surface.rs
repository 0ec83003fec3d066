use super::Frame;
use tracing::debug;

/// Something a [`Frame`] can be painted on.
pub trait Surface {
    /// False while the surface has no usable area yet (not laid out, zero
    /// sized, already torn down).
    fn is_ready(&self) -> bool;

    fn draw(&mut self, frame: &Frame);
}

/// Paints `frame` when there is a ready surface, otherwise drops it.
/// Returns whether anything was drawn.
pub fn present(surface: Option<&mut dyn Surface>, frame: &Frame) -> bool {
    match surface {
        Some(s) if s.is_ready() => {
            s.draw(frame);
            true
        }
        Some(_) => {
            debug!("Surface not ready, skipping frame");
            false
        }
        None => {
            debug!("No surface attached, skipping frame");
            false
        }
    }
}
