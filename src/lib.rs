pub mod core {
    pub mod config;
    pub mod error;
    pub mod state;
    pub mod tracing_init;
}

pub mod api {
    pub mod client;
    pub mod comment_server;
}

pub mod models {
    pub mod blob;
    pub mod claim;
    pub mod comment;
    pub mod file_item;
    pub mod peer;
    pub mod subscription;
    pub mod support;
}

pub mod validation {
    pub mod params;
}

pub mod utils {
    pub mod channels;
    pub mod output;
    pub mod pool;
    pub mod text;
    pub mod time;
}

pub mod search {
    pub mod channel;
    pub mod claim_file;
    pub mod item;
    pub mod sort;
}

pub mod comments {
    pub mod ops;
    pub mod render;
    pub mod tree;
}

pub mod peers {
    pub mod aggregate;
    pub mod channels;
    pub mod search;
    pub mod summary;
}

pub mod download {
    pub mod multi;
    pub mod single;
}

pub mod clean {
    pub mod delete;
    pub mod multi;
    pub mod space;
}

pub mod blobs {
    pub mod action;
    pub mod count;
    pub mod ratio;
}

pub mod subscriptions {
    pub mod ops;
    pub mod render;
}

pub mod supports {
    pub mod ops;
}

pub mod report {
    pub mod summary;
}

pub mod cli;

#[cfg(test)]
mod testing;
