mod place;

pub use place::PlaceRepository;
