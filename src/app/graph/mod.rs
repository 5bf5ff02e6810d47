mod camera;
mod view;

pub(in crate::app) use camera::Camera;
