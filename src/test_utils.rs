pub mod test_helpers {
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::rc::Rc;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use crate::host::Host;
    use crate::pdf::{
        DocumentEngine, DocumentHandle, EngineDocument, EngineFault, LoadParams, PageInfo, Raster,
        Viewer, Viewport, WorkerOptions, check_page_number,
    };

    /// Generous upper bound for waiting on the engine worker in tests
    pub const TIMEOUT: Duration = Duration::from_secs(5);

    /// Locator whose resolution always fails
    pub const FAIL_DOCUMENT: &str = "fail_document";
    /// Locator whose page 2 cannot be fetched
    pub const FAIL_PAGE: &str = "fail_page";
    /// Locator whose page 2 cannot be drawn
    pub const FAIL_RENDER: &str = "fail_render";

    pub const LETTER: PageInfo = PageInfo {
        rotation: 0,
        width: 612.0,
        height: 792.0,
    };

    /// Something the scripted engine was asked to do
    #[derive(Clone, Debug, PartialEq)]
    pub enum JournalEntry {
        Configure(String),
        Open(LoadParams),
        FetchPage(usize),
        Draw {
            page: usize,
            viewport: Viewport,
            density: f32,
        },
        Release(String),
    }

    /// Shared record of engine activity
    #[derive(Clone, Debug, Default)]
    pub struct Journal {
        entries: Arc<Mutex<Vec<JournalEntry>>>,
    }

    impl Journal {
        fn push(&self, entry: JournalEntry) {
            self.entries
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .push(entry);
        }

        pub fn entries(&self) -> Vec<JournalEntry> {
            self.entries
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .clone()
        }

        pub fn clear(&self) {
            self.entries
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .clear();
        }

        /// Locators opened, in order
        pub fn opens(&self) -> Vec<String> {
            self.entries()
                .into_iter()
                .filter_map(|e| match e {
                    JournalEntry::Open(params) => Some(params.locator),
                    _ => None,
                })
                .collect()
        }

        /// Pages drawn, in order
        pub fn draws(&self) -> Vec<usize> {
            self.entries()
                .into_iter()
                .filter_map(|e| match e {
                    JournalEntry::Draw { page, .. } => Some(page),
                    _ => None,
                })
                .collect()
        }

        pub fn releases(&self) -> Vec<String> {
            self.entries()
                .into_iter()
                .filter_map(|e| match e {
                    JournalEntry::Release(locator) => Some(locator),
                    _ => None,
                })
                .collect()
        }
    }

    /// Color a scripted page is painted with
    pub fn page_color(number: usize) -> [u8; 4] {
        [(number % 256) as u8, 0x80, 0x40, 0xFF]
    }

    /// Deterministic engine driven by locator names.
    ///
    /// Unknown locators resolve to a three-page letter-size document. The
    /// [`FAIL_DOCUMENT`], [`FAIL_PAGE`] and [`FAIL_RENDER`] locators fail at the
    /// matching step.
    #[derive(Clone, Debug, Default)]
    pub struct ScriptedEngine {
        documents: HashMap<String, Vec<PageInfo>>,
        journal: Journal,
    }

    impl ScriptedEngine {
        pub fn new() -> Self {
            Self::default()
        }

        /// Script the pages of `locator`
        pub fn with_document(mut self, locator: &str, pages: Vec<PageInfo>) -> Self {
            self.documents.insert(locator.to_string(), pages);
            self
        }

        pub fn journal(&self) -> Journal {
            self.journal.clone()
        }
    }

    impl DocumentEngine for ScriptedEngine {
        fn configure(&mut self, options: &WorkerOptions) {
            self.journal.push(JournalEntry::Configure(options.src.clone()));
        }

        fn open(&mut self, params: &LoadParams) -> Result<Box<dyn EngineDocument>, EngineFault> {
            self.journal.push(JournalEntry::Open(params.clone()));
            if params.locator == FAIL_DOCUMENT {
                return Err(EngineFault::generic("Invalid PDF structure"));
            }

            let pages = self
                .documents
                .get(&params.locator)
                .cloned()
                .unwrap_or_else(|| vec![LETTER; 3]);
            Ok(Box::new(ScriptedDocument {
                locator: params.locator.clone(),
                pages,
                journal: self.journal.clone(),
            }))
        }
    }

    struct ScriptedDocument {
        locator: String,
        pages: Vec<PageInfo>,
        journal: Journal,
    }

    impl EngineDocument for ScriptedDocument {
        fn page_count(&self) -> usize {
            self.pages.len()
        }

        fn page(&self, number: usize) -> Result<PageInfo, EngineFault> {
            self.journal.push(JournalEntry::FetchPage(number));
            check_page_number(number, self.pages.len())?;
            if self.locator == FAIL_PAGE && number == 2 {
                return Err(EngineFault::generic("Missing page object"));
            }
            Ok(self.pages[number - 1])
        }

        fn draw(
            &self,
            number: usize,
            viewport: &Viewport,
            density: f32,
        ) -> Result<Raster, EngineFault> {
            self.journal.push(JournalEntry::Draw {
                page: number,
                viewport: *viewport,
                density,
            });
            check_page_number(number, self.pages.len())?;
            if self.locator == FAIL_RENDER && number == 2 {
                return Err(EngineFault::generic("Corrupt content stream"));
            }
            let (width, height) = viewport.raster_size(density);
            Ok(Raster::filled(width, height, page_color(number)))
        }
    }

    impl Drop for ScriptedDocument {
        fn drop(&mut self) {
            self.journal.push(JournalEntry::Release(self.locator.clone()));
        }
    }

    /// A callback the viewer delivered
    #[derive(Clone, Debug, PartialEq, Eq)]
    pub enum Notification {
        Loaded { locator: String, page_count: usize },
        Failed,
        InvalidLocation,
    }

    /// Records every callback a viewer delivers
    #[derive(Clone, Debug, Default)]
    pub struct CallbackLog {
        notifications: Rc<RefCell<Vec<Notification>>>,
    }

    impl CallbackLog {
        /// Register recording callbacks on `viewer`. The invalid-location callback is
        /// only registered when asked for, since its presence changes behavior.
        pub fn attach<H: Host>(viewer: &mut Viewer<H>, with_invalid_location: bool) -> Self {
            let log = Self::default();

            let notifications = Rc::clone(&log.notifications);
            viewer.on_document_load_success(move |doc: &DocumentHandle| {
                notifications.borrow_mut().push(Notification::Loaded {
                    locator: doc.locator.clone(),
                    page_count: doc.page_count,
                });
            });
            let notifications = Rc::clone(&log.notifications);
            viewer.on_document_load_fail(move || {
                notifications.borrow_mut().push(Notification::Failed);
            });
            if with_invalid_location {
                let notifications = Rc::clone(&log.notifications);
                viewer.on_invalid_location(move || {
                    notifications.borrow_mut().push(Notification::InvalidLocation);
                });
            }

            log
        }

        pub fn notifications(&self) -> Vec<Notification> {
            self.notifications.borrow().clone()
        }

        pub fn count(&self, predicate: impl Fn(&Notification) -> bool) -> usize {
            self.notifications
                .borrow()
                .iter()
                .filter(|n| predicate(*n))
                .count()
        }

        pub fn loaded(&self) -> usize {
            self.count(|n| matches!(n, Notification::Loaded { .. }))
        }

        pub fn failed(&self) -> usize {
            self.count(|n| matches!(n, Notification::Failed))
        }

        pub fn invalid_location(&self) -> usize {
            self.count(|n| matches!(n, Notification::InvalidLocation))
        }
    }
}
