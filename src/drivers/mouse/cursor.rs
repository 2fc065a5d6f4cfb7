//! Cursor sprites and the draw/animation state machine.

use crate::gfx;
use crate::log_warn;

/// What the cursor renderer is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawState {
    Hidden,
    Loading,
    Normal,
}

/// A compiled-in animated sprite: contiguous frames of `width * height`
/// palette bytes. Zero bytes are transparent when `alpha` is set.
#[derive(Debug, Clone, Copy)]
pub struct Sprite {
    pub width: usize,
    pub height: usize,
    pub frame_size: usize,
    pub frame_count: usize,
    pub alpha: bool,
    data: &'static [u8],
}

impl Sprite {
    /// Look a sprite up by name. None when the asset does not exist.
    pub fn load(name: &str) -> Option<Sprite> {
        match name {
            "cursor/normal" => Some(Sprite {
                width: 8,
                height: 8,
                frame_size: 64,
                frame_count: 2,
                alpha: true,
                data: NORMAL_FRAMES,
            }),
            "cursor/loading" => Some(Sprite {
                width: 8,
                height: 8,
                frame_size: 64,
                frame_count: 4,
                alpha: true,
                data: LOADING_FRAMES,
            }),
            _ => None,
        }
    }

    /// Copy one frame into `dest`. `index` must be a valid frame index.
    pub fn read_frame(&self, index: usize, dest: &mut [u8]) {
        let start = index * self.frame_size;
        dest[..self.frame_size].copy_from_slice(&self.data[start..start + self.frame_size]);
    }
}

/// Largest frame any cursor sprite may carry; sized for the scratch
/// buffer below.
pub const MAX_FRAME_BYTES: usize = 256;

/// Owns the draw state, the animation frame index and the sprite
/// resources. The frame index is always a valid index into the active
/// sprite's frames.
pub struct CursorRenderer {
    state: DrawState,
    frame_index: usize,
    normal: Option<Sprite>,
    loading: Option<Sprite>,
    scratch: [u8; MAX_FRAME_BYTES],
}

impl CursorRenderer {
    pub const fn empty() -> Self {
        CursorRenderer {
            state: DrawState::Loading,
            frame_index: 0,
            normal: None,
            loading: None,
            scratch: [0; MAX_FRAME_BYTES],
        }
    }

    /// Fetch the sprite resources. A missing asset leaves its state
    /// drawing nothing rather than failing the driver.
    pub fn load_sprites(&mut self) {
        self.normal = Sprite::load("cursor/normal");
        self.loading = Sprite::load("cursor/loading");
        if self.normal.is_none() {
            log_warn!("Cursor sprite 'cursor/normal' unavailable");
        }
        if self.loading.is_none() {
            log_warn!("Cursor sprite 'cursor/loading' unavailable");
        }
    }

    pub fn state(&self) -> DrawState {
        self.state
    }

    /// Switch draw state. The frame index restarts so it stays valid
    /// for the newly active sprite.
    pub fn set_state(&mut self, state: DrawState) {
        if self.state != state {
            self.state = state;
            self.frame_index = 0;
        }
    }

    pub fn frame_index(&self) -> usize {
        self.frame_index
    }

    /// Render the active sprite's current frame at (x, y), then step
    /// the animation by one frame, wrapping at the sprite's frame
    /// count.
    pub fn draw(&mut self, x: i32, y: i32) {
        let sprite = match self.state {
            DrawState::Hidden => return,
            DrawState::Normal => self.normal,
            DrawState::Loading => self.loading,
        };
        let Some(sprite) = sprite else {
            return;
        };

        sprite.read_frame(self.frame_index, &mut self.scratch);
        gfx::blit(
            &self.scratch[..sprite.frame_size],
            sprite.width,
            sprite.height,
            sprite.alpha,
            x,
            y,
        );
        self.frame_index = (self.frame_index + 1) % sprite.frame_count;
        gfx::present();
    }
}

// Palette bytes for the built-in cursors.
const T: u8 = 0x00; // transparent
const W: u8 = 0x0F; // white
const G: u8 = 0x08; // gray

#[rustfmt::skip]
static NORMAL_FRAMES: &[u8] = &[
    // frame 0: white arrow
    W, T, T, T, T, T, T, T,
    W, W, T, T, T, T, T, T,
    W, W, W, T, T, T, T, T,
    W, W, W, W, T, T, T, T,
    W, W, W, W, W, T, T, T,
    W, W, W, T, T, T, T, T,
    W, T, W, T, T, T, T, T,
    T, T, W, T, T, T, T, T,
    // frame 1: gray-edged arrow
    G, T, T, T, T, T, T, T,
    G, W, T, T, T, T, T, T,
    G, W, W, T, T, T, T, T,
    G, W, W, W, T, T, T, T,
    G, W, W, W, G, T, T, T,
    G, W, G, T, T, T, T, T,
    G, T, G, T, T, T, T, T,
    T, T, G, T, T, T, T, T,
];

#[rustfmt::skip]
static LOADING_FRAMES: &[u8] = &[
    // frame 0: vertical bar
    T, T, T, W, W, T, T, T,
    T, T, T, W, W, T, T, T,
    T, T, T, W, W, T, T, T,
    T, T, T, W, W, T, T, T,
    T, T, T, W, W, T, T, T,
    T, T, T, W, W, T, T, T,
    T, T, T, W, W, T, T, T,
    T, T, T, W, W, T, T, T,
    // frame 1: diagonal
    W, T, T, T, T, T, T, T,
    T, W, T, T, T, T, T, T,
    T, T, W, T, T, T, T, T,
    T, T, T, W, T, T, T, T,
    T, T, T, T, W, T, T, T,
    T, T, T, T, T, W, T, T,
    T, T, T, T, T, T, W, T,
    T, T, T, T, T, T, T, W,
    // frame 2: horizontal bar
    T, T, T, T, T, T, T, T,
    T, T, T, T, T, T, T, T,
    T, T, T, T, T, T, T, T,
    W, W, W, W, W, W, W, W,
    W, W, W, W, W, W, W, W,
    T, T, T, T, T, T, T, T,
    T, T, T, T, T, T, T, T,
    T, T, T, T, T, T, T, T,
    // frame 3: anti-diagonal
    T, T, T, T, T, T, T, W,
    T, T, T, T, T, T, W, T,
    T, T, T, T, T, W, T, T,
    T, T, T, T, W, T, T, T,
    T, T, T, W, T, T, T, T,
    T, T, W, T, T, T, T, T,
    T, W, T, T, T, T, T, T,
    W, T, T, T, T, T, T, T,
];

#[cfg(test)]
mod tests {
    use super::*;

    fn loaded_renderer() -> CursorRenderer {
        let mut renderer = CursorRenderer::empty();
        renderer.load_sprites();
        renderer
    }

    #[test_case]
    fn frame_index_advances_by_one_modulo_frame_count() {
        let mut renderer = loaded_renderer();
        renderer.set_state(DrawState::Normal); // 2 frames
        assert_eq!(renderer.frame_index(), 0);
        renderer.draw(10, 10);
        assert_eq!(renderer.frame_index(), 1);
        renderer.draw(10, 10);
        assert_eq!(renderer.frame_index(), 0);
        renderer.draw(10, 10);
        assert_eq!(renderer.frame_index(), 1);
    }

    #[test_case]
    fn frame_index_is_always_valid_for_active_sprite() {
        let mut renderer = loaded_renderer();
        renderer.set_state(DrawState::Loading); // 4 frames
        for _ in 0..9 {
            renderer.draw(0, 0);
            assert!(renderer.frame_index() < 4);
        }
        // Switching sprites restarts the cycle inside the smaller range.
        renderer.set_state(DrawState::Normal);
        assert_eq!(renderer.frame_index(), 0);
    }

    #[test_case]
    fn hidden_draw_is_a_no_op() {
        let mut renderer = loaded_renderer();
        renderer.set_state(DrawState::Hidden);
        for _ in 0..3 {
            renderer.draw(0, 0);
        }
        assert_eq!(renderer.frame_index(), 0);
    }

    #[test_case]
    fn missing_sprite_degrades_to_no_op() {
        let mut renderer = CursorRenderer::empty();
        // No sprites loaded at all.
        renderer.set_state(DrawState::Normal);
        renderer.draw(5, 5);
        assert_eq!(renderer.frame_index(), 0);
    }

    #[test_case]
    fn sprite_lookup_misses_return_none() {
        assert!(Sprite::load("cursor/does-not-exist").is_none());
    }
}
