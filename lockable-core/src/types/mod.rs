mod requirements;
mod resource;

pub use requirements::Requirements;
pub use resource::Resource;
