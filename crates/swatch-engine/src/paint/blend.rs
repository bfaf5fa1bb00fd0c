/// Blend modes understood by the batch renderer.
///
/// The `*Npm` variants are for sources with straight (non-premultiplied)
/// alpha. Shapes request one of the base modes; [`BlendMode::for_alpha`]
/// picks the variant matching the texture they sample.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub enum BlendMode {
    #[default]
    Normal,
    Add,
    Multiply,
    Screen,
    NormalNpm,
    AddNpm,
    ScreenNpm,
}

impl BlendMode {
    /// Maps a requested mode onto the variant that matches a texture's alpha
    /// representation.
    ///
    /// Multiply has no straight-alpha variant and is returned unchanged.
    pub fn for_alpha(self, premultiplied_alpha: bool) -> BlendMode {
        use BlendMode::*;
        if premultiplied_alpha {
            match self {
                NormalNpm => Normal,
                AddNpm => Add,
                ScreenNpm => Screen,
                other => other,
            }
        } else {
            match self {
                Normal => NormalNpm,
                Add => AddNpm,
                Screen => ScreenNpm,
                other => other,
            }
        }
    }
}
