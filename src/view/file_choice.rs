/// Label text shown while a file input has no selection
pub const NO_FILE_CHOSEN: &str = "No file chosen";

/// Mirror of a file input: the chosen file's name, if any.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileChoice {
    name: Option<String>,
}

impl FileChoice {
    /// Takes the first selected name. An empty selection clears the choice.
    pub fn choose<I, S>(&mut self, selection: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.name = selection
            .into_iter()
            .next()
            .map(Into::into)
            .filter(|name: &String| !name.is_empty());
    }

    pub fn clear(&mut self) {
        self.name = None;
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(NO_FILE_CHOSEN)
    }
}
