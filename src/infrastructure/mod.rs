pub mod page_dom;

pub use page_dom::PageDom;
