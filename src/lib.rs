pub mod core {
    pub mod cache;
    pub mod domain;
    pub mod library;
    pub mod repository;
}

pub mod utils {
    pub mod ddb;
    pub mod logs;
}

pub mod books;
pub mod patrons;
