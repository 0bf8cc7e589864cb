pub mod repo_page;
