pub mod shared {
    pub mod constants;
    pub mod error;
    pub mod frame;
    pub mod geometry;
}

pub mod imaging;

pub mod features {
    pub mod domain {
        pub mod feature_extractor;
    }
    pub mod infrastructure;
}

pub mod blobs {
    pub mod domain {
        pub mod blob;
        pub mod blob_descriptor;
    }
    pub mod infrastructure;
}

pub mod faces {
    pub mod domain {
        pub mod face;
        pub mod face_landmarks;
        pub mod object_cascade;
        pub mod species;
    }
    pub mod infrastructure;
}

pub mod io {
    pub mod domain {
        pub mod image_reader;
        pub mod image_writer;
    }
    pub mod infrastructure;
}
